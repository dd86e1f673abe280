//! Home directory resolution for fq
//!
//! # Precedence
//!
//! 1. `FQ_HOME` environment variable (if set and non-empty)
//! 2. `dirs::home_dir()` platform default
//!
//! Integration tests set `FQ_HOME` to a temp directory so that default queue
//! locations and the global config never touch the real home directory.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the home directory used to derive default queue and config paths
///
/// # Errors
///
/// Returns an error if `FQ_HOME` is not set and the platform home directory
/// cannot be determined.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("FQ_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    dirs::home_dir().context("Could not determine home directory")
}
