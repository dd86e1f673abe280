//! Count command implementation

use anyhow::Result;
use clap::Args;
use file_queue_core::queue::SharedQueue;

/// Print the number of waiting messages
#[derive(Args, Debug)]
pub struct CountArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the count command
pub fn execute(args: CountArgs, queue: &SharedQueue) -> Result<()> {
    let count = queue.count()?;
    if args.json {
        println!("{}", serde_json::json!({ "count": count }));
    } else {
        println!("{count}");
    }
    Ok(())
}
