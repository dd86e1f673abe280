//! Named producer channel over a shared queue

use crate::io::error::QueueError;
use crate::queue::{MessageQueue, SharedQueue};
use crate::schema::{Message, Metadata};

/// Sends messages carrying a fixed name into a queue
#[derive(Clone)]
pub struct ProducerChannel {
    queue: SharedQueue,
    name: String,
}

impl ProducerChannel {
    pub fn new(queue: SharedQueue, name: impl Into<String>) -> Self {
        Self {
            queue,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue `payload` as a message stamped with the current time
    pub fn send(&self, payload: impl Into<Vec<u8>>, metadata: Metadata) -> Result<(), QueueError> {
        let message = Message::with_current_time(self.name.clone(), metadata, payload);
        self.queue.add(&message)
    }
}

impl std::fmt::Debug for ProducerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerChannel")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryQueue;
    use std::sync::Arc;

    #[test]
    fn test_send_uses_channel_name() {
        let queue: SharedQueue = Arc::new(InMemoryQueue::<Message>::new());
        let channel = ProducerChannel::new(Arc::clone(&queue), "stock_update");

        let mut metadata = Metadata::new();
        metadata.insert("sku".to_string(), "A-1".to_string());
        channel.send("12", metadata.clone()).unwrap();

        let received = queue.next().unwrap();
        assert_eq!(received.name(), "stock_update");
        assert_eq!(received.payload(), b"12");
        assert_eq!(received.metadata(), &metadata);
    }

    #[test]
    fn test_clones_share_queue() {
        let queue: SharedQueue = Arc::new(InMemoryQueue::<Message>::new());
        let channel = ProducerChannel::new(Arc::clone(&queue), "a");
        let other = channel.clone();

        channel.send(Vec::new(), Metadata::new()).unwrap();
        other.send(Vec::new(), Metadata::new()).unwrap();

        assert_eq!(queue.count().unwrap(), 2);
        assert_eq!(other.name(), "a");
    }
}
