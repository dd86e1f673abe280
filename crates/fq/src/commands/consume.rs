//! Consume command implementation

use anyhow::Result;
use clap::Args;
use file_queue_core::queue::{from_fn, SharedQueue};
use file_queue_core::{Message, ReceiveError};
use std::io::Write;

/// Dequeue the oldest messages and print them
#[derive(Args, Debug)]
pub struct ConsumeArgs {
    /// Maximum number of messages to dequeue
    #[arg(long, default_value_t = 1)]
    max: usize,

    /// Output one JSON object per line
    #[arg(long)]
    json: bool,
}

/// One output line for `message`, newline included
///
/// Text lines carry the payload bytes unchanged. JSON lines carry it as a
/// string when it is UTF-8 and as `payload_bytes` otherwise.
fn render(message: &Message, json: bool) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = if json {
        let mut output = serde_json::json!({
            "name": message.name(),
            "metadata": message.metadata(),
            "created_at": message.created_at().to_rfc3339(),
        });
        match message.payload_str() {
            Some(text) => output["payload"] = serde_json::Value::from(text),
            None => output["payload_bytes"] = serde_json::Value::from(message.payload()),
        }
        serde_json::to_vec(&output)?
    } else {
        let mut line = Vec::with_capacity(message.name().len() + 1 + message.payload().len() + 1);
        line.extend_from_slice(message.name().as_bytes());
        line.push(b'\t');
        line.extend_from_slice(message.payload());
        line
    };
    line.push(b'\n');
    Ok(line)
}

/// Execute the consume command
pub fn execute(args: ConsumeArgs, queue: &SharedQueue) -> Result<()> {
    let json = args.json;
    let stdout = std::io::stdout();

    let mut receiver = from_fn(|message: Message| -> Result<(), ReceiveError> {
        let line = render(&message, json)?;
        let mut out = stdout.lock();
        out.write_all(&line)?;
        out.flush()?;
        Ok(())
    });

    let delivered = queue.consume(&mut receiver, args.max)?;
    if delivered == 0 {
        eprintln!("Queue is empty");
    }

    Ok(())
}
