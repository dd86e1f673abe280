//! File-backed queue engine
//!
//! One message is one file in the storage directory, named
//! `<sortable prefix>-<message name>[_<n>]`. A separate lock file serializes
//! enqueue, dequeue and clear across every process pointed at the same pair of
//! paths; there is no broker and no state cached between calls.
//!
//! # Directory Structure
//!
//! ```text
//! <storage>/
//!   01771234567890123456-catalog_import     - waiting message
//!   01771234567890123456-catalog_import_1   - same prefix, enqueued after
//!   .48213-7.tmp                            - write in progress (hidden)
//!   .01771234567890124000-price.corrupt     - undecodable, set aside (hidden)
//! <lock file>                             - flock handle, never read
//! ```

use crate::io::codec;
use crate::io::error::QueueError;
use crate::io::fs::{ensure_directory, is_hidden, unique_name, Filesystem, OsFilesystem};
use crate::io::lock::{LockCoordinator, LockPolicy};
use crate::io::naming::{
    advance_past, compare_file_names, is_valid_message_name, parse_prefix, FileNamer,
    SortableNamer,
};
use crate::queue::{deliver, MessageQueue, MessageReceiver};
use crate::schema::Message;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Queue stored as one file per message under a shared directory
#[derive(Debug)]
pub struct FileQueue<F = OsFilesystem, N = SortableNamer> {
    storage_path: PathBuf,
    lock_path: PathBuf,
    fs: F,
    namer: N,
    lock_policy: LockPolicy,
}

/// Messages taken from disk in one locked scan, plus an error that cut the
/// scan short after some files were already removed
struct Batch {
    messages: Vec<Message>,
    deferred_error: Option<QueueError>,
}

impl FileQueue {
    /// Open a queue on the real filesystem with the blocking lock policy
    ///
    /// Nothing is created on disk until the first operation that needs it.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::InvalidArgument` if either path is empty, the lock
    /// path does not name a file, or the lock file would live inside the
    /// storage directory.
    pub fn new(
        storage_path: impl Into<PathBuf>,
        lock_path: impl Into<PathBuf>,
    ) -> Result<Self, QueueError> {
        Self::with_parts(
            storage_path,
            lock_path,
            OsFilesystem,
            SortableNamer,
            LockPolicy::Blocking,
        )
    }
}

impl<F: Filesystem, N: FileNamer> FileQueue<F, N> {
    /// Open a queue with explicit filesystem, naming and lock policy
    pub fn with_parts(
        storage_path: impl Into<PathBuf>,
        lock_path: impl Into<PathBuf>,
        fs: F,
        namer: N,
        lock_policy: LockPolicy,
    ) -> Result<Self, QueueError> {
        let storage_path = storage_path.into();
        let lock_path = lock_path.into();
        validate_paths(&storage_path, &lock_path)?;

        Ok(Self {
            storage_path,
            lock_path,
            fs,
            namer,
            lock_policy,
        })
    }

    /// Replace the lock policy
    #[must_use]
    pub fn with_lock_policy(mut self, lock_policy: LockPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn lock_policy(&self) -> LockPolicy {
        self.lock_policy
    }

    fn coordinator(&self) -> LockCoordinator<'_, F> {
        LockCoordinator::new(&self.fs, &self.lock_path, self.lock_policy)
    }

    /// Every regular file in the storage directory; a missing directory is empty
    fn all_files(&self) -> Result<Vec<String>, QueueError> {
        match self.fs.list_files(&self.storage_path) {
            Ok(names) => Ok(names),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(QueueError::io(&self.storage_path, e)),
        }
    }

    /// Message file names, oldest first
    fn message_files(&self) -> Result<Vec<String>, QueueError> {
        let mut names: Vec<String> = self
            .all_files()?
            .into_iter()
            .filter(|name| !is_hidden(name))
            .collect();
        names.sort_unstable_by(|a, b| compare_file_names(a, b));
        Ok(names)
    }

    /// Write one message file; runs under the lock
    fn store(&self, message: &Message) -> Result<String, QueueError> {
        let newest = self
            .all_files()?
            .iter()
            .filter(|name| !is_hidden(name))
            .filter_map(|name| parse_prefix(name))
            .max();
        if let Some(newest) = newest {
            advance_past(newest);
        }

        let base_name = self.namer.base_name(message);
        let file_name = unique_name(&self.fs, &self.storage_path, &base_name);
        let path = self.storage_path.join(&file_name);

        let bytes = codec::encode(message).map_err(|e| QueueError::Codec {
            path: path.clone(),
            source: e,
        })?;

        self.fs
            .write_file(&path, &bytes)
            .map_err(|e| QueueError::MessageNotStored { path, source: e })?;

        Ok(file_name)
    }

    /// Read and remove up to `max` of the oldest messages; runs under the lock
    ///
    /// All selected files are read before any is removed, so a read failure
    /// leaves the queue untouched.
    fn take_oldest(&self, max: usize) -> Result<Batch, QueueError> {
        let mut selected = Vec::new();

        for file_name in self.message_files()? {
            if selected.len() == max {
                break;
            }

            let path = self.storage_path.join(&file_name);
            let bytes = self
                .fs
                .read_file(&path)
                .map_err(|e| QueueError::io(&path, e))?;

            match codec::decode(&bytes) {
                Ok(message) => selected.push((path, message)),
                Err(e) => {
                    warn!(file = %file_name, "setting aside undecodable message file: {e}");
                    self.set_aside(&file_name)?;
                }
            }
        }

        let mut messages = Vec::with_capacity(selected.len());
        for (path, message) in selected {
            if let Err(e) = self.fs.remove_file(&path) {
                // Undeleted messages stay queued and must not be delivered now
                return Ok(Batch {
                    messages,
                    deferred_error: Some(QueueError::io(path, e)),
                });
            }
            messages.push(message);
        }

        Ok(Batch {
            messages,
            deferred_error: None,
        })
    }

    /// Hide an undecodable file so it no longer blocks the head of the queue
    fn set_aside(&self, file_name: &str) -> Result<(), QueueError> {
        let from = self.storage_path.join(file_name);
        let hidden = format!(".{}.corrupt", truncate_name(file_name, MAX_SET_ASIDE_STEM));
        let to = self
            .storage_path
            .join(unique_name(&self.fs, &self.storage_path, &hidden));
        self.fs
            .rename(&from, &to)
            .map_err(|e| QueueError::io(&from, e))
    }
}

impl<F: Filesystem, N: FileNamer> MessageQueue for FileQueue<F, N> {
    fn add(&self, message: &Message) -> Result<(), QueueError> {
        if !is_valid_message_name(message.name()) {
            return Err(QueueError::invalid(format!(
                "message name {:?} cannot be used in a file name",
                message.name()
            )));
        }

        ensure_directory(&self.fs, &self.storage_path)?;

        let file_name = self.coordinator().run(|| self.store(message))?;
        debug!(file = %file_name, "message enqueued");
        Ok(())
    }

    fn count(&self) -> Result<usize, QueueError> {
        Ok(self
            .all_files()?
            .iter()
            .filter(|name| !is_hidden(name))
            .count())
    }

    fn consume(&self, receiver: &mut dyn MessageReceiver, max: usize) -> Result<usize, QueueError> {
        if max == 0 {
            return Ok(0);
        }

        let batch = self.coordinator().run(|| self.take_oldest(max))?;
        debug!(taken = batch.messages.len(), max, "messages dequeued");

        // The lock is released; receivers run outside it
        let delivered = deliver(receiver, batch.messages)?;

        match batch.deferred_error {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    fn clear(&self) -> Result<(), QueueError> {
        let removed = self.coordinator().run(|| {
            let mut removed = 0usize;
            for file_name in self.all_files()? {
                let path = self.storage_path.join(&file_name);
                match self.fs.remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(QueueError::io(path, e)),
                }
            }
            Ok(removed)
        })?;

        debug!(removed, path = %self.storage_path.display(), "queue cleared");
        Ok(())
    }
}

/// Longest part of a file name kept in its set-aside name, leaving room for
/// the dot, `.corrupt` and a collision suffix within a 255-byte name limit
const MAX_SET_ASIDE_STEM: usize = 240;

fn truncate_name(name: &str, max_bytes: usize) -> &str {
    if name.len() <= max_bytes {
        return name;
    }
    let mut end = max_bytes;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn validate_paths(storage_path: &Path, lock_path: &Path) -> Result<(), QueueError> {
    if storage_path.as_os_str().is_empty() {
        return Err(QueueError::invalid("storage path must not be empty"));
    }
    if lock_path.as_os_str().is_empty() {
        return Err(QueueError::invalid("lock file path must not be empty"));
    }
    if lock_path.file_name().is_none() {
        return Err(QueueError::invalid(format!(
            "lock file path {} does not name a file",
            lock_path.display()
        )));
    }
    if lock_path == storage_path || lock_path.parent() == Some(storage_path) {
        return Err(QueueError::invalid(format!(
            "lock file {} must live outside the storage directory {}",
            lock_path.display(),
            storage_path.display()
        )));
    }
    Ok(())
}
