//! JSON output for CLI commands
//!
//! One JSON object per command on stdout, UTF-8.

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

fn envelope_ok(data: Value) -> Value {
    serde_json::json!({
        "status": "ok",
        "data": data
    })
}

fn envelope_error(code: &str, message: &str) -> Value {
    serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a success response to stdout.
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&mut io::stdout(), &envelope_ok(data))
}

/// Write an error response to stdout.
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&mut io::stdout(), &envelope_error(code, message))
}
