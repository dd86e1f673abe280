//! Queue contracts and backends
//!
//! Producers use [`MessageQueue::add`]; consumers either pull one message at a
//! time with [`MessageQueue::next`] or have a batch pushed to a
//! [`MessageReceiver`] with [`MessageQueue::consume`].

pub mod backend;
pub mod channel;
pub mod file;
pub mod memory;

use crate::io::error::{QueueError, ReceiveError};
use crate::schema::Message;

pub use backend::{open_queue, SharedQueue};
pub use channel::ProducerChannel;
pub use file::FileQueue;
pub use memory::InMemoryQueue;

/// Push-style consumer invoked once per delivered message
pub trait MessageReceiver {
    fn receive(&mut self, message: Message) -> Result<(), ReceiveError>;
}

/// Collects delivered messages in delivery order
impl MessageReceiver for Vec<Message> {
    fn receive(&mut self, message: Message) -> Result<(), ReceiveError> {
        self.push(message);
        Ok(())
    }
}

/// Receiver built from a closure, see [`from_fn`]
pub struct FnReceiver<F>(F);

impl<F> MessageReceiver for FnReceiver<F>
where
    F: FnMut(Message) -> Result<(), ReceiveError>,
{
    fn receive(&mut self, message: Message) -> Result<(), ReceiveError> {
        (self.0)(message)
    }
}

/// Wrap a closure as a [`MessageReceiver`]
pub fn from_fn<F>(f: F) -> FnReceiver<F>
where
    F: FnMut(Message) -> Result<(), ReceiveError>,
{
    FnReceiver(f)
}

/// Capability set shared by every queue backend
pub trait MessageQueue {
    /// Enqueue one message
    fn add(&self, message: &Message) -> Result<(), QueueError>;

    /// Number of messages currently waiting; a best-effort snapshot
    fn count(&self) -> Result<usize, QueueError>;

    /// Dequeue up to `max` of the oldest messages and hand them to `receiver`
    /// in order, returning how many were delivered
    ///
    /// Messages are removed from the queue before delivery, so a receiver
    /// error loses the message it failed on and any after it in this batch.
    fn consume(&self, receiver: &mut dyn MessageReceiver, max: usize) -> Result<usize, QueueError>;

    /// Dequeue the oldest message, failing with [`QueueError::EmptyQueue`]
    fn next(&self) -> Result<Message, QueueError> {
        let mut received: Vec<Message> = Vec::with_capacity(1);
        self.consume(&mut received, 1)?;
        received.pop().ok_or(QueueError::EmptyQueue)
    }

    /// Remove every waiting message
    fn clear(&self) -> Result<(), QueueError>;
}

/// Hand `messages` to `receiver` in order, stopping at the first failure
pub(crate) fn deliver(
    receiver: &mut dyn MessageReceiver,
    messages: Vec<Message>,
) -> Result<usize, QueueError> {
    let total = messages.len();
    let mut delivered = 0;

    for message in messages {
        if let Err(source) = receiver.receive(message) {
            let dropped = total - delivered - 1;
            tracing::warn!(delivered, dropped, "receiver failed, remaining batch discarded");
            return Err(QueueError::Receiver { delivered, source });
        }
        delivered += 1;
    }

    Ok(delivered)
}
