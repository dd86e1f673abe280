//! Shared logging initialization for fq binaries.

use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

fn parse_level(value: Option<&str>) -> tracing::Level {
    match value.unwrap_or("info").trim().to_ascii_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Initialize process-level tracing output from `FQ_LOG`.
///
/// Safe to call multiple times; only the first call installs the subscriber.
/// Output goes to stderr so it never mixes with consumed message output.
pub fn init() {
    if INIT.get().is_some() {
        return;
    }
    let level = parse_level(std::env::var("FQ_LOG").ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    let _ = INIT.set(());
}
