//! fq - filesystem-backed message queue
//!
//! A thin CLI over `file-queue-core`: enqueue messages, consume them in
//! order, inspect the queue depth and clear it.

use clap::Parser;

mod commands;

use commands::Cli;

fn main() {
    file_queue_core::logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
