//! Clear command implementation

use anyhow::Result;
use clap::Args;
use file_queue_core::queue::SharedQueue;

/// Remove every waiting message
#[derive(Args, Debug)]
pub struct ClearArgs {}

/// Execute the clear command
pub fn execute(_args: ClearArgs, queue: &SharedQueue) -> Result<()> {
    queue.clear()?;
    println!("Queue cleared");
    Ok(())
}
