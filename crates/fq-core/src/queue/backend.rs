//! Backend selection from configuration

use crate::config::{BackendKind, Config};
use crate::io::error::QueueError;
use crate::io::fs::OsFilesystem;
use crate::io::naming::SortableNamer;
use crate::queue::{FileQueue, InMemoryQueue, MessageQueue};
use crate::schema::Message;
use std::sync::Arc;
use tracing::debug;

/// Queue handle shared between producers and consumers
pub type SharedQueue = Arc<dyn MessageQueue + Send + Sync>;

/// Open the backend named by `config`
///
/// # Errors
///
/// Returns `QueueError::InvalidArgument` if the file backend is selected
/// without both a storage path and a lock path, or if those paths are invalid.
pub fn open_queue(config: &Config) -> Result<SharedQueue, QueueError> {
    match config.backend() {
        BackendKind::File => {
            let storage_path = config
                .queue
                .storage_path
                .clone()
                .ok_or_else(|| QueueError::invalid("file backend requires a storage path"))?;
            let lock_path = config
                .queue
                .lock_path
                .clone()
                .ok_or_else(|| QueueError::invalid("file backend requires a lock file path"))?;

            debug!(
                storage = %storage_path.display(),
                lock = %lock_path.display(),
                "opening file queue"
            );
            let queue = FileQueue::with_parts(
                storage_path,
                lock_path,
                OsFilesystem,
                SortableNamer,
                config.lock_policy(),
            )?;
            Ok(Arc::new(queue))
        }
        BackendKind::Memory => {
            debug!("opening in-memory queue");
            Ok(Arc::new(InMemoryQueue::<Message>::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::io::lock::LockPolicy;
    use crate::schema::Metadata;
    use tempfile::TempDir;

    #[test]
    fn test_open_file_backend() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            queue: QueueConfig {
                backend: Some(BackendKind::File),
                storage_path: Some(temp_dir.path().join("queue")),
                lock_path: Some(temp_dir.path().join("queue.lock")),
            },
            lock: Some(LockPolicy::Blocking),
        };

        let queue = open_queue(&config).unwrap();
        queue
            .add(&Message::with_current_time("foo", Metadata::new(), Vec::new()))
            .unwrap();

        assert_eq!(queue.count().unwrap(), 1);
        assert!(temp_dir.path().join("queue").is_dir());
    }

    #[test]
    fn test_file_backend_requires_paths() {
        let config = Config {
            queue: QueueConfig {
                backend: Some(BackendKind::File),
                storage_path: None,
                lock_path: None,
            },
            lock: None,
        };

        let result = open_queue(&config);
        assert!(matches!(result, Err(QueueError::InvalidArgument { .. })));
    }

    #[test]
    fn test_open_memory_backend() {
        let config = Config {
            queue: QueueConfig {
                backend: Some(BackendKind::Memory),
                ..Default::default()
            },
            lock: None,
        };

        let queue = open_queue(&config).unwrap();
        queue
            .add(&Message::with_current_time("foo", Metadata::new(), Vec::new()))
            .unwrap();

        assert_eq!(queue.next().unwrap().name(), "foo");
        assert!(matches!(queue.next(), Err(QueueError::EmptyQueue)));
    }
}
