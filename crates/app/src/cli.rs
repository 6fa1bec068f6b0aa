use anyhow::Result;

use crate::stream;

pub const USAGE: &str =
    "Usage: fingercast stream [options]\n\nRun `fingercast stream --help` for the full option list.";

pub fn handle_commands(args: &[String]) -> Result<bool> {
    match args.get(1).map(|s| s.as_str()) {
        Some("stream") => {
            stream::run_from_args(args)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
