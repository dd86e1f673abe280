//! Queue message value type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form string metadata attached to a message
pub type Metadata = BTreeMap<String, String>;

/// An immutable message travelling through a queue
///
/// Ordering inside a file-backed queue is decided by the storage file name,
/// never by `created_at`; the timestamp is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    name: String,
    payload: Vec<u8>,
    #[serde(default)]
    metadata: Metadata,
    created_at: DateTime<Utc>,
}

impl Message {
    /// Build a message stamped with the current time
    pub fn with_current_time(
        name: impl Into<String>,
        metadata: Metadata,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(name, metadata, payload, Utc::now())
    }

    /// Build a message with an explicit creation time
    pub fn new(
        name: impl Into<String>,
        metadata: Metadata,
        payload: impl Into<Vec<u8>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
            metadata,
            created_at,
        }
    }

    /// Queue/channel identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as UTF-8 text, if it is valid UTF-8
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Consume the message, returning its payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
