//! On-disk encoding of queued messages
//!
//! Each message file holds one JSON envelope:
//!
//! ```text
//! {"version":1,"name":"...","payload":[...],"metadata":{...},"created_at":"2026-02-11T14:30:00.123456789Z"}
//! ```

use crate::schema::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Envelope version written by this build
pub const FORMAT_VERSION: u32 = 1;

/// Reasons a message file could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported message format version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    #[serde(flatten)]
    message: &'a Message,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    #[serde(flatten)]
    message: Message,
}

/// Serialize a message into the bytes stored in its queue file
pub fn encode(message: &Message) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&EnvelopeRef {
        version: FORMAT_VERSION,
        message,
    })
}

/// Parse the bytes of a queue file back into a message
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    if envelope.version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(envelope.version));
    }
    Ok(envelope.message)
}
