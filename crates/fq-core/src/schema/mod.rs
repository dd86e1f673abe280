//! Schema types for queued messages

pub mod message;

pub use message::{Message, Metadata};
