//! Add command implementation

use anyhow::{Context, Result};
use clap::Args;
use file_queue_core::queue::{ProducerChannel, SharedQueue};
use file_queue_core::Metadata;
use std::io::Read;
use std::path::PathBuf;

/// Enqueue a message
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Message name (queue/channel identifier)
    name: String,

    /// Payload text (or omit to use --file or --stdin; empty if none given)
    payload: Option<String>,

    /// Read the payload from a file
    #[arg(long, conflicts_with_all = ["stdin", "payload"])]
    file: Option<PathBuf>,

    /// Read the payload from stdin
    #[arg(long, conflicts_with_all = ["file", "payload"])]
    stdin: bool,

    /// Metadata entry as KEY=VALUE (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    meta: Vec<(String, String)>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Execute the add command
pub fn execute(args: AddArgs, queue: SharedQueue) -> Result<()> {
    let payload = if let Some(ref path) = args.file {
        std::fs::read(path).with_context(|| format!("Failed to read payload file {path:?}"))?
    } else if args.stdin {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read payload from stdin")?;
        buf
    } else {
        args.payload.clone().unwrap_or_default().into_bytes()
    };

    let metadata: Metadata = args.meta.into_iter().collect();
    let size = payload.len();

    let channel = ProducerChannel::new(queue, args.name);
    channel.send(payload, metadata)?;

    if args.json {
        let output = serde_json::json!({
            "action": "add",
            "name": channel.name(),
            "bytes": size,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Queued '{}' ({size} bytes)", channel.name());
    }

    Ok(())
}
