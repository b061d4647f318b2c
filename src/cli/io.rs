//! JSON output for CLI commands
//!
//! - One JSON object per command on stdout
//! - Logs go to stderr and never mix with it

use std::io::{self, Write};

use serde::Serialize;

use super::errors::CliResult;

/// Write a success response to stdout.
pub fn write_response<T: Serialize>(data: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    write_response_to(&mut stdout, data)
}

/// Write `{"status":"ok","data":...}` followed by a newline.
pub fn write_response_to<W: Write, T: Serialize>(writer: &mut W, data: &T) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data,
    });

    serde_json::to_writer_pretty(&mut *writer, &response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
