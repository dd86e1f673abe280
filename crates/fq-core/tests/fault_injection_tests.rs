//! Integration tests driving the engine through a failure-injecting filesystem

use file_queue_core::io::{Filesystem, LockPolicy, OsFilesystem, OsLock, SortableNamer};
use file_queue_core::queue::{from_fn, FileQueue, MessageQueue};
use file_queue_core::{Message, Metadata, QueueError};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Lock,
    Unlock,
    Write,
    Remove,
}

/// Knobs shared between a test and the filesystem it hands to the queue
#[derive(Default)]
struct Faults {
    disk_full: AtomicBool,
    /// A peer creates the directory first; our create reports AlreadyExists
    dir_created_by_peer: AtomicBool,
    /// Creation reports success but the directory never appears
    dir_vanishes: AtomicBool,
    dir_permission_denied: AtomicBool,
    fail_remove: AtomicBool,
    events: Mutex<Vec<Event>>,
}

impl Faults {
    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn last_lock_event(&self) -> Option<Event> {
        self.events()
            .into_iter()
            .rev()
            .find(|e| matches!(e, Event::Lock | Event::Unlock))
    }
}

struct FaultyFs {
    inner: OsFilesystem,
    faults: Arc<Faults>,
}

impl Filesystem for FaultyFs {
    type Lock = OsLock;

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.faults.dir_permission_denied.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
        }
        if self.faults.dir_vanishes.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.faults.dir_created_by_peer.load(Ordering::SeqCst) {
            self.inner.create_dir_all(path)?;
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "File exists"));
        }
        self.inner.create_dir_all(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>> {
        self.inner.list_files(dir)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read_file(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.faults.record(Event::Write);
        if self.faults.disk_full.load(Ordering::SeqCst) {
            return Err(io::Error::other("No space left on device"));
        }
        self.inner.write_file(path, bytes)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.faults.record(Event::Remove);
        if self.faults.fail_remove.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.inner.remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.inner.rename(from, to)
    }

    fn lock(&self, path: &Path) -> io::Result<OsLock> {
        let lock = self.inner.lock(path)?;
        self.faults.record(Event::Lock);
        Ok(lock)
    }

    fn try_lock(&self, path: &Path) -> io::Result<Option<OsLock>> {
        let lock = self.inner.try_lock(path)?;
        if lock.is_some() {
            self.faults.record(Event::Lock);
        }
        Ok(lock)
    }

    fn unlock(&self, lock: OsLock) -> io::Result<()> {
        self.faults.record(Event::Unlock);
        self.inner.unlock(lock)
    }
}

struct Fixture {
    _temp_dir: TempDir,
    storage: PathBuf,
    faults: Arc<Faults>,
    queue: FileQueue<FaultyFs>,
}

fn fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let storage = temp_dir.path().join("queue/content");
    let lock = temp_dir.path().join("queue/lock/lockfile");
    let faults = Arc::new(Faults::default());
    let fs = FaultyFs {
        inner: OsFilesystem,
        faults: Arc::clone(&faults),
    };
    let queue =
        FileQueue::with_parts(&storage, lock, fs, SortableNamer, LockPolicy::Blocking).unwrap();

    Fixture {
        _temp_dir: temp_dir,
        storage,
        faults,
        queue,
    }
}

fn message(name: &str) -> Message {
    Message::with_current_time(name, Metadata::new(), b"payload".to_vec())
}

#[test]
fn test_disk_full_fails_with_message_not_stored() {
    let f = fixture();
    f.queue.add(&message("before")).unwrap();
    assert_eq!(f.queue.count().unwrap(), 1);

    f.faults.disk_full.store(true, Ordering::SeqCst);
    let result = f.queue.add(&message("foo_bar"));

    assert!(matches!(result, Err(QueueError::MessageNotStored { .. })));
    assert_eq!(f.queue.count().unwrap(), 1);
    // The lock was still released
    assert_eq!(f.faults.last_lock_event(), Some(Event::Unlock));
}

#[test]
fn test_directory_created_by_peer_is_not_an_error() {
    let f = fixture();
    f.faults.dir_created_by_peer.store(true, Ordering::SeqCst);

    f.queue.add(&message("raced")).unwrap();

    assert!(f.storage.is_dir());
    assert_eq!(f.queue.count().unwrap(), 1);
}

#[test]
fn test_directory_missing_after_creation_is_fatal() {
    let f = fixture();
    f.faults.dir_vanishes.store(true, Ordering::SeqCst);

    let result = f.queue.add(&message("lost"));

    assert!(matches!(
        result,
        Err(QueueError::DirectoryUnavailable { source: None, .. })
    ));
    // Bootstrap fails before the lock is ever taken
    assert!(f.faults.events().is_empty());
}

#[test]
fn test_directory_permission_denied_is_fatal() {
    let f = fixture();
    f.faults.dir_permission_denied.store(true, Ordering::SeqCst);

    let result = f.queue.add(&message("denied"));

    match result {
        Err(QueueError::DirectoryUnavailable {
            source: Some(e), ..
        }) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_receiver_runs_outside_the_lock() {
    let f = fixture();
    f.queue.add(&message("a")).unwrap();
    f.queue.add(&message("b")).unwrap();

    let faults = Arc::clone(&f.faults);
    let mut observed = Vec::new();
    let mut receiver = from_fn(|m: Message| {
        observed.push((m.name().to_string(), faults.last_lock_event()));
        Ok(())
    });

    assert_eq!(f.queue.consume(&mut receiver, 2).unwrap(), 2);
    drop(receiver);

    assert_eq!(
        observed,
        vec![
            ("a".to_string(), Some(Event::Unlock)),
            ("b".to_string(), Some(Event::Unlock)),
        ]
    );
}

#[test]
fn test_add_and_consume_take_one_lock_cycle_each() {
    let f = fixture();
    f.queue.add(&message("a")).unwrap();
    assert_eq!(
        f.faults.events(),
        vec![Event::Lock, Event::Write, Event::Unlock]
    );

    let mut received: Vec<Message> = Vec::new();
    f.queue.consume(&mut received, 5).unwrap();
    assert_eq!(
        f.faults.events(),
        vec![
            Event::Lock,
            Event::Write,
            Event::Unlock,
            Event::Lock,
            Event::Remove,
            Event::Unlock,
        ]
    );
}

#[test]
fn test_count_does_not_lock() {
    let f = fixture();
    f.queue.add(&message("a")).unwrap();
    let before = f.faults.events().len();

    assert_eq!(f.queue.count().unwrap(), 1);
    assert_eq!(f.faults.events().len(), before);
}

#[test]
fn test_failed_remove_keeps_message_queued_and_undelivered() {
    let f = fixture();
    f.queue.add(&message("stuck")).unwrap();
    f.faults.fail_remove.store(true, Ordering::SeqCst);

    let mut received: Vec<Message> = Vec::new();
    let result = f.queue.consume(&mut received, 1);

    assert!(matches!(result, Err(QueueError::Io { .. })));
    assert!(received.is_empty());
    assert_eq!(f.queue.count().unwrap(), 1);
    assert_eq!(f.faults.last_lock_event(), Some(Event::Unlock));

    f.faults.fail_remove.store(false, Ordering::SeqCst);
    assert_eq!(f.queue.next().unwrap().name(), "stuck");
}

#[test]
fn test_lock_released_when_receiver_fails() {
    let f = fixture();
    f.queue.add(&message("a")).unwrap();

    let mut receiver = from_fn(|_m: Message| Err("receiver down".into()));
    let result = f.queue.consume(&mut receiver, 1);

    assert!(matches!(result, Err(QueueError::Receiver { delivered: 0, .. })));
    assert_eq!(f.faults.last_lock_event(), Some(Event::Unlock));
    assert_eq!(f.queue.count().unwrap(), 0);
}
