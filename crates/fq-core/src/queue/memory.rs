//! In-process queue for tests and single-process use

use crate::io::error::QueueError;
use crate::queue::{deliver, MessageQueue, MessageReceiver};
use crate::schema::Message;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// FIFO queue holding serialized values in memory
///
/// Values are serialized on `add` so that anything accepted here could also
/// have been written to a file-backed queue.
pub struct InMemoryQueue<T = Message> {
    entries: Mutex<VecDeque<Vec<u8>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for InMemoryQueue<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for InMemoryQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryQueue")
            .field("len", &self.entries().len())
            .finish()
    }
}

impl<T> InMemoryQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<Vec<u8>>> {
        // The deque is never left half-updated, so a poisoned lock is still usable
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop every queued value
    pub fn clear(&self) {
        self.entries().clear();
    }
}

impl<T: Serialize + DeserializeOwned> InMemoryQueue<T> {
    /// Append a value
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnsupportedPayload` if the value cannot be serialized.
    pub fn add(&self, value: &T) -> Result<(), QueueError> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| QueueError::UnsupportedPayload { source: e })?;
        self.entries().push_back(bytes);
        Ok(())
    }

    /// Remove and return the oldest value
    ///
    /// # Errors
    ///
    /// Returns `QueueError::EmptyQueue` if nothing is queued.
    pub fn next(&self) -> Result<T, QueueError> {
        let bytes = self.entries().pop_front().ok_or(QueueError::EmptyQueue)?;
        serde_json::from_slice(&bytes).map_err(|e| QueueError::UnsupportedPayload { source: e })
    }

    /// Remove up to `max` of the oldest values
    fn take(&self, max: usize) -> Vec<Vec<u8>> {
        let mut entries = self.entries();
        let n = max.min(entries.len());
        entries.drain(..n).collect()
    }
}

impl MessageQueue for InMemoryQueue<Message> {
    fn add(&self, message: &Message) -> Result<(), QueueError> {
        InMemoryQueue::add(self, message)
    }

    fn count(&self) -> Result<usize, QueueError> {
        Ok(self.len())
    }

    fn consume(&self, receiver: &mut dyn MessageReceiver, max: usize) -> Result<usize, QueueError> {
        // The mutex guard is dropped inside take(), before any receiver runs
        let messages = self
            .take(max)
            .into_iter()
            .map(|bytes| {
                serde_json::from_slice(&bytes)
                    .map_err(|e| QueueError::UnsupportedPayload { source: e })
            })
            .collect::<Result<Vec<Message>, _>>()?;
        deliver(receiver, messages)
    }

    fn next(&self) -> Result<Message, QueueError> {
        InMemoryQueue::next(self)
    }

    fn clear(&self) -> Result<(), QueueError> {
        InMemoryQueue::clear(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Metadata;
    use std::collections::HashMap;

    fn message(name: &str) -> Message {
        Message::with_current_time(name, Metadata::new(), b"payload".to_vec())
    }

    #[test]
    fn test_initially_empty() {
        let queue: InMemoryQueue = InMemoryQueue::new();
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
        assert_eq!(MessageQueue::count(&queue).unwrap(), 0);
    }

    #[test]
    fn test_rejects_value_that_cannot_be_serialized() {
        // JSON object keys must be strings
        let queue: InMemoryQueue<HashMap<(u8, u8), u8>> = InMemoryQueue::new();
        let mut value = HashMap::new();
        value.insert((1, 2), 3);

        let result = queue.add(&value);
        assert!(matches!(result, Err(QueueError::UnsupportedPayload { .. })));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_add_then_next() {
        let queue: InMemoryQueue<String> = InMemoryQueue::new();
        queue.add(&"hello".to_string()).unwrap();
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.next().unwrap(), "hello");
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_next_on_empty_queue_fails() {
        let queue: InMemoryQueue<String> = InMemoryQueue::new();
        assert!(matches!(queue.next(), Err(QueueError::EmptyQueue)));
    }

    #[test]
    fn test_returns_values_in_insertion_order() {
        let queue: InMemoryQueue<u32> = InMemoryQueue::new();
        for i in 0..10 {
            queue.add(&i).unwrap();
        }
        let drained: Vec<u32> = (0..10).map(|_| queue.next().unwrap()).collect();
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_message_queue_consume_and_clear() {
        let queue: InMemoryQueue = InMemoryQueue::new();
        let shared: &dyn MessageQueue = &queue;
        for name in ["a", "b", "c"] {
            shared.add(&message(name)).unwrap();
        }

        let mut received: Vec<Message> = Vec::new();
        assert_eq!(shared.consume(&mut received, 2).unwrap(), 2);
        let names: Vec<&str> = received.iter().map(Message::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(shared.count().unwrap(), 1);

        shared.clear().unwrap();
        assert_eq!(shared.count().unwrap(), 0);
        assert!(matches!(shared.next(), Err(QueueError::EmptyQueue)));
    }

    #[test]
    fn test_message_round_trip() {
        let queue: InMemoryQueue = InMemoryQueue::new();
        let mut metadata = Metadata::new();
        metadata.insert("k".to_string(), "v".to_string());
        let original = Message::with_current_time("n", metadata, vec![9u8, 8, 7]);

        queue.add(&original).unwrap();
        assert_eq!(queue.next().unwrap(), original);
    }
}
