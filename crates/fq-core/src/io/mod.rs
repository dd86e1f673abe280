//! Filesystem layer for the file-backed queue
//!
//! - **Primitives**: the injectable [`Filesystem`] trait, atomic temp-then-rename
//!   writes, collision-free file names and race-tolerant directory bootstrap
//! - **Locking**: advisory `flock` on a dedicated lock file, blocking by default,
//!   with an optional backoff policy
//! - **Naming**: fixed-width nanosecond prefixes so file name order is enqueue order
//! - **Codec**: versioned JSON envelope for message files

pub mod codec;
pub mod error;
pub mod fs;
pub mod lock;
pub mod naming;

pub use error::{QueueError, ReceiveError};
pub use fs::{ensure_directory, unique_name, Filesystem, OsFilesystem, OsLock};
pub use lock::{LockCoordinator, LockGuard, LockPolicy};
pub use naming::{FileNamer, SortableNamer};
