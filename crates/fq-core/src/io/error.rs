//! Error types for queue operations

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by a [`MessageReceiver`](crate::queue::MessageReceiver).
pub type ReceiveError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during queue operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// A constructor or operation was given a value it cannot work with
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The storage directory could not be created, or vanished right after creation
    #[error("Storage directory {path} is unavailable")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Writing a message file failed; nothing was enqueued
    #[error("Message could not be stored at {path}: {source}")]
    MessageNotStored {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Pull-style retrieval on a queue with nothing in it
    #[error("Queue is empty")]
    EmptyQueue,

    /// The value offered to an in-memory queue cannot be serialized
    #[error("Payload cannot be represented: {source}")]
    UnsupportedPayload { source: serde_json::Error },

    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to encode a message
    #[error("Codec error for {path}: {source}")]
    Codec {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to acquire the lock file under the retry policy
    #[error("Failed to acquire lock on {path} after {retries} retries")]
    LockTimeout { path: PathBuf, retries: u32 },

    /// A receiver failed; messages handed to it earlier in the same call stay consumed
    #[error("Receiver failed after {delivered} delivered message(s): {source}")]
    Receiver {
        delivered: usize,
        #[source]
        source: ReceiveError,
    },
}

impl QueueError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
