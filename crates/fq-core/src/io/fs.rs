//! Filesystem primitives used by the queue engine
//!
//! Everything the engine does to disk goes through the [`Filesystem`] trait so
//! tests can substitute a recording or failure-injecting implementation.
//! [`OsFilesystem`] is the production implementation.

use crate::io::error::QueueError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File operations the queue needs, including the advisory lock
pub trait Filesystem {
    /// Handle representing a held lock; released through [`Filesystem::unlock`]
    type Lock;

    fn is_dir(&self, path: &Path) -> bool;

    /// Whether any directory entry (file, directory or dangling link) exists at `path`
    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Names of the regular files in `dir`, hidden ones included, unsorted
    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `bytes` so that `path` either holds all of them or does not exist
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Block until an exclusive lock on `path` is held
    fn lock(&self, path: &Path) -> io::Result<Self::Lock>;

    /// Take the exclusive lock if it is free, `Ok(None)` if someone else holds it
    fn try_lock(&self, path: &Path) -> io::Result<Option<Self::Lock>>;

    fn unlock(&self, lock: Self::Lock) -> io::Result<()>;
}

/// Lock held on a lock file through `flock(2)` (or `LockFileEx` on Windows)
#[derive(Debug)]
pub struct OsLock {
    file: File,
    path: PathBuf,
}

impl OsLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// [`Filesystem`] backed by the real operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl OsFilesystem {
    fn open_lock_file(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            match fs::create_dir_all(parent) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }

        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
    }
}

impl Filesystem for OsFilesystem {
    type Lock = OsLock;

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // Message names are chosen by this crate and are always UTF-8
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            names.push(name);
        }
        Ok(names)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let tmp_path = temp_path_for(path)?;

        let result = (|| -> io::Result<()> {
            let mut tmp_file = File::create(&tmp_path)?;
            tmp_file.write_all(bytes)?;
            tmp_file.sync_all()?;
            fs::rename(&tmp_path, path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn lock(&self, path: &Path) -> io::Result<OsLock> {
        let file = Self::open_lock_file(path)?;
        file.lock_exclusive()?;
        Ok(OsLock {
            file,
            path: path.to_path_buf(),
        })
    }

    fn try_lock(&self, path: &Path) -> io::Result<Option<OsLock>> {
        let file = Self::open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(OsLock {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn unlock(&self, lock: OsLock) -> io::Result<()> {
        FileExt::unlock(&lock.file)
    }
}

/// Hidden entries (temp files, quarantined files) are never messages
pub fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with('.')
}

/// Hidden sibling used while writing `path`
///
/// The name does not embed the target name, so any target that fits the
/// filesystem's name limit also has a temp name that fits.
fn temp_path_for(path: &Path) -> io::Result<PathBuf> {
    if path.file_name().is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        ));
    }
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(path.with_file_name(format!(".{}-{seq}.tmp", std::process::id())))
}

/// Make sure `path` is a directory, creating it (and its parents) if needed
///
/// A peer process creating the directory between the check and the creation
/// call is not an error. Any other creation failure, or a directory that is
/// still missing afterwards, yields [`QueueError::DirectoryUnavailable`].
pub fn ensure_directory<F: Filesystem + ?Sized>(fs: &F, path: &Path) -> Result<(), QueueError> {
    if fs.is_dir(path) {
        return Ok(());
    }

    match fs.create_dir_all(path) {
        Ok(()) => debug!(path = %path.display(), "created storage directory"),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "storage directory created concurrently");
        }
        Err(e) => {
            return Err(QueueError::DirectoryUnavailable {
                path: path.to_path_buf(),
                source: Some(e),
            });
        }
    }

    if !fs.is_dir(path) {
        return Err(QueueError::DirectoryUnavailable {
            path: path.to_path_buf(),
            source: None,
        });
    }
    Ok(())
}

/// First free name in `dir` among `candidate`, `candidate_1`, `candidate_2`, ...
///
/// The probe is not atomic on its own; callers hold the queue lock across the
/// probe and the subsequent write.
pub fn unique_name<F: Filesystem + ?Sized>(fs: &F, dir: &Path, candidate: &str) -> String {
    let mut name = candidate.to_string();
    let mut increment = 0u64;
    while fs.exists(&dir.join(&name)) {
        increment += 1;
        name = format!("{candidate}_{increment}");
    }
    name
}
