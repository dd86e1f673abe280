//! Configuration types

use crate::io::lock::LockPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Queue backend and storage locations
    #[serde(default)]
    pub queue: QueueConfig,
    /// Lock acquisition policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockPolicy>,
}

/// Which queue implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One file per message under a shared directory
    #[default]
    File,
    /// Process-local, nothing persisted
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown backend '{other}' (expected 'file' or 'memory')")),
        }
    }
}

/// Queue configuration; unset fields fall back to defaults during resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    /// Directory holding message files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
    /// Lock file shared by every producer and consumer of this queue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_path: Option<PathBuf>,
}

impl Config {
    /// Defaults rooted at `home_dir`
    pub fn defaults_for_home(home_dir: &Path) -> Self {
        let base = home_dir.join(".config/fq");
        Self {
            queue: QueueConfig {
                backend: Some(BackendKind::File),
                storage_path: Some(base.join("queue")),
                lock_path: Some(base.join("queue.lock")),
            },
            lock: Some(LockPolicy::Blocking),
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.queue.backend.unwrap_or_default()
    }

    pub fn lock_policy(&self) -> LockPolicy {
        self.lock.unwrap_or_default()
    }
}
