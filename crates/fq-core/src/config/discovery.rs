//! Configuration discovery and resolution

use super::types::{BackendKind, Config};
use crate::io::lock::LockPolicy;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parsing error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Command-line overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Override backend
    pub backend: Option<BackendKind>,
    /// Override storage directory
    pub storage_path: Option<PathBuf>,
    /// Override lock file
    pub lock_path: Option<PathBuf>,
    /// Switch to the retry lock policy with this many retries
    pub lock_retries: Option<u32>,
    /// Explicit config file, loaded after the discovered ones
    pub config_path: Option<PathBuf>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables
/// 3. Explicit config file (`overrides.config_path`), then repo-local `.fq.toml`
/// 4. Global config (~/.config/fq/config.toml)
/// 5. Defaults
///
/// Discovered files that fail to parse are skipped with a warning; an
/// explicitly requested file that fails to load is an error.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    current_dir: &Path,
    home_dir: &Path,
) -> Result<Config, ConfigError> {
    let mut config = Config::defaults_for_home(home_dir);

    // 4. Try global config
    let global_config_path = home_dir.join(".config/fq/config.toml");
    if global_config_path.exists() {
        match load_config_file(&global_config_path) {
            Ok(file_config) => merge_config(&mut config, file_config),
            Err(e) => warn!("Skipping global config: {e}"),
        }
    }

    // 3. Try repo-local config (current dir or git root)
    if let Some(repo_config) = find_repo_local_config(current_dir) {
        match load_config_file(&repo_config) {
            Ok(file_config) => merge_config(&mut config, file_config),
            Err(e) => warn!("Skipping repo config: {e}"),
        }
    }

    if let Some(ref explicit) = overrides.config_path {
        merge_config(&mut config, load_config_file(explicit)?);
    }

    // 2. Apply environment variables
    apply_env_overrides(&mut config);

    // 1. Apply command-line overrides
    apply_cli_overrides(&mut config, overrides);

    Ok(config)
}

/// Find repo-local config file
///
/// Searches current directory and parent directories up to git root
fn find_repo_local_config(current_dir: &Path) -> Option<PathBuf> {
    let mut dir = current_dir;

    loop {
        let config_path = dir.join(".fq.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        // Stop at git root
        if dir.join(".git").exists() {
            break;
        }

        dir = dir.parent()?;
    }

    None
}

/// Load config from a TOML file
fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&contents).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Merge file config into base config; only fields the file sets are taken
fn merge_config(base: &mut Config, file: Config) {
    if file.queue.backend.is_some() {
        base.queue.backend = file.queue.backend;
    }
    if file.queue.storage_path.is_some() {
        base.queue.storage_path = file.queue.storage_path;
    }
    if file.queue.lock_path.is_some() {
        base.queue.lock_path = file.queue.lock_path;
    }
    if file.lock.is_some() {
        base.lock = file.lock;
    }
}

/// Apply environment variable overrides
fn apply_env_overrides(config: &mut Config) {
    if let Ok(backend) = std::env::var("FQ_BACKEND") {
        match backend.parse::<BackendKind>() {
            Ok(kind) => config.queue.backend = Some(kind),
            Err(e) => warn!("Ignoring FQ_BACKEND: {e}"),
        }
    }

    if let Some(path) = non_empty_env("FQ_STORAGE_PATH") {
        config.queue.storage_path = Some(PathBuf::from(path));
    }

    if let Some(path) = non_empty_env("FQ_LOCK_PATH") {
        config.queue.lock_path = Some(PathBuf::from(path));
    }

    if let Some(retries) = non_empty_env("FQ_LOCK_RETRIES") {
        match retries.parse::<u32>() {
            Ok(max_retries) => config.lock = Some(LockPolicy::Retry { max_retries }),
            Err(e) => warn!("Ignoring FQ_LOCK_RETRIES={retries:?}: {e}"),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Apply command-line overrides
fn apply_cli_overrides(config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(backend) = overrides.backend {
        config.queue.backend = Some(backend);
    }

    if let Some(ref path) = overrides.storage_path {
        config.queue.storage_path = Some(path.clone());
    }

    if let Some(ref path) = overrides.lock_path {
        config.queue.lock_path = Some(path.clone());
    }

    if let Some(max_retries) = overrides.lock_retries {
        config.lock = Some(LockPolicy::Retry { max_retries });
    }
}
