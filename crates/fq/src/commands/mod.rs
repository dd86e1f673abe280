//! CLI command dispatch and execution

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use file_queue_core::config::{resolve_config, BackendKind, ConfigOverrides};
use file_queue_core::home::get_home_dir;
use file_queue_core::queue::{open_queue, SharedQueue};
use std::path::PathBuf;
use tracing::debug;

mod add;
mod clear;
mod consume;
mod count;

/// fq - filesystem-backed message queue
#[derive(Parser, Debug)]
#[command(
    name = "fq",
    version,
    about = "Filesystem-backed message queue",
    long_about = "Enqueue and consume messages through plain files in a shared directory, \
                  serialized by an advisory lock file. Every process pointed at the same \
                  storage directory and lock file shares one queue."
)]
pub struct Cli {
    #[command(flatten)]
    queue: QueueArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options selecting which queue to operate on
#[derive(Args, Debug)]
struct QueueArgs {
    /// Directory holding message files
    #[arg(long, global = true, value_name = "DIR")]
    storage: Option<PathBuf>,

    /// Lock file shared by all producers and consumers of the queue
    #[arg(long, global = true, value_name = "FILE")]
    lock: Option<PathBuf>,

    /// Queue backend: file or memory
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Give up waiting for the lock after this many backoff retries
    #[arg(long, global = true, value_name = "N")]
    lock_retries: Option<u32>,

    /// Additional config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl QueueArgs {
    fn open(&self) -> Result<SharedQueue> {
        let home_dir = get_home_dir()?;
        let current_dir = std::env::current_dir()?;

        let overrides = ConfigOverrides {
            backend: self.backend,
            storage_path: self.storage.clone(),
            lock_path: self.lock.clone(),
            lock_retries: self.lock_retries,
            config_path: self.config.clone(),
        };

        let config = resolve_config(&overrides, &current_dir, &home_dir)?;
        debug!(?config, "resolved configuration");

        open_queue(&config).context("Failed to open queue")
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enqueue a message
    Add(add::AddArgs),

    /// Dequeue the oldest messages and print them
    Consume(consume::ConsumeArgs),

    /// Print the number of waiting messages
    Count(count::CountArgs),

    /// Remove every waiting message
    Clear(clear::ClearArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let queue = self.queue.open()?;
        match self.command {
            Commands::Add(args) => add::execute(args, queue),
            Commands::Consume(args) => consume::execute(args, &queue),
            Commands::Count(args) => count::execute(args, &queue),
            Commands::Clear(args) => clear::execute(args, &queue),
        }
    }
}
