//! Sortable message file names
//!
//! A message file is named `<prefix>-<message name>`, where the prefix is a
//! fixed-width decimal reading of a nanosecond clock. Fixed width makes
//! lexicographic order of prefixes equal to enqueue order. Names that collide
//! get a `_<n>` suffix, which [`ordering_key`] compares numerically so that
//! `_10` sorts after `_9`.

use crate::schema::Message;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Width of the timestamp prefix; `u64::MAX` has 20 decimal digits
pub const PREFIX_WIDTH: usize = 20;

static LAST_PREFIX: AtomicU64 = AtomicU64::new(0);

/// Chooses the base file name for a message before collision probing
pub trait FileNamer {
    fn base_name(&self, message: &Message) -> String;
}

/// Default namer: `<20-digit nanosecond prefix>-<message name>`
#[derive(Debug, Clone, Copy, Default)]
pub struct SortableNamer;

impl FileNamer for SortableNamer {
    fn base_name(&self, message: &Message) -> String {
        format!("{}-{}", sortable_prefix(), message.name())
    }
}

/// Current time in nanoseconds since the Unix epoch, strictly increasing
/// within this process
pub fn next_timestamp_nanos() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0);

    let mut last = LAST_PREFIX.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_PREFIX.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

/// Make every later prefix from this process greater than `nanos`
///
/// Called under the queue lock with the newest prefix already on disk, so a
/// wall clock that stepped backwards, or a peer process whose clock runs
/// ahead, cannot put a new message in front of an older one.
pub fn advance_past(nanos: u64) {
    LAST_PREFIX.fetch_max(nanos, Ordering::AcqRel);
}

/// Timestamp prefix of a message file name, if it has one
pub fn parse_prefix(file_name: &str) -> Option<u64> {
    let prefix = file_name.get(..PREFIX_WIDTH)?;
    if file_name.as_bytes().get(PREFIX_WIDTH) != Some(&b'-')
        || !prefix.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    prefix.parse().ok()
}

/// Split a file name into its stem and collision suffix number
///
/// `base` is `(base, 0)` and `base_<n>` is `(base, n)`.
pub fn ordering_key(file_name: &str) -> (&str, u64) {
    let Some((stem, digits)) = file_name.rsplit_once('_') else {
        return (file_name, 0);
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return (file_name, 0);
    }
    match digits.parse() {
        Ok(n) => (stem, n),
        Err(_) => (file_name, 0),
    }
}

/// Delivery order of two message file names
pub fn compare_file_names(a: &str, b: &str) -> CmpOrdering {
    ordering_key(a)
        .cmp(&ordering_key(b))
        .then_with(|| a.cmp(b))
}

/// Zero-padded prefix for the next message file
pub fn sortable_prefix() -> String {
    format!("{:0width$}", next_timestamp_nanos(), width = PREFIX_WIDTH)
}

/// Check that a message name can be embedded in a file name
pub fn is_valid_message_name(name: &str) -> bool {
    !name.contains(['/', '\\', '\0'])
}
