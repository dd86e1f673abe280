//! Core library for fq, a filesystem-backed message queue
//!
//! A queue is a directory of message files plus a lock file. Any process that
//! can reach both paths is a peer producer or consumer; there is no broker.
//! Enqueue and dequeue each run inside one exclusive advisory lock scope, and
//! receivers are always invoked after that lock is released.
//!
//! ```rust,no_run
//! use file_queue_core::queue::{FileQueue, MessageQueue};
//! use file_queue_core::{Message, Metadata};
//!
//! # fn example() -> Result<(), file_queue_core::QueueError> {
//! let queue = FileQueue::new("/var/spool/fq/content", "/var/spool/fq/lock/lockfile")?;
//! queue.add(&Message::with_current_time("catalog_import", Metadata::new(), b"{}".to_vec()))?;
//!
//! let mut received: Vec<Message> = Vec::new();
//! let delivered = queue.consume(&mut received, 10)?;
//! assert_eq!(delivered, received.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod home;
pub mod io;
pub mod logging;
pub mod queue;
pub mod schema;

pub use io::{QueueError, ReceiveError};
pub use schema::{Message, Metadata};

// Re-export toml for callers that build config programmatically
pub use toml;
