//! Raw result output: a human-readable field tree (`textproto`) and a
//! compact binary encoding (`binproto`) of the full scan result.

use std::io::Write;

use anyhow::Result;
use serde_json::Value;

use crate::model::ScanResult;

/// Writes the full result as an indented `field: value` tree, one field per
/// line, nested records in braces.
pub fn write_textproto(result: &ScanResult, writer: &mut dyn Write) -> Result<()> {
    let value = serde_json::to_value(result)?;
    if let Value::Object(map) = &value {
        for (key, value) in map {
            write_field(key, value, 0, writer)?;
        }
    }
    Ok(())
}

fn write_field(key: &str, value: &Value, indent: usize, writer: &mut dyn Write) -> Result<()> {
    let pad = "  ".repeat(indent);
    match value {
        Value::Null => {}
        Value::Object(map) => {
            writeln!(writer, "{pad}{key} {{")?;
            for (inner_key, inner) in map {
                write_field(inner_key, inner, indent + 1, writer)?;
            }
            writeln!(writer, "{pad}}}")?;
        }
        // Repeated fields: one line or block per element.
        Value::Array(items) => {
            for item in items {
                write_field(key, item, indent, writer)?;
            }
        }
        Value::String(s) => writeln!(writer, "{pad}{key}: {s:?}")?,
        other => writeln!(writer, "{pad}{key}: {other}")?,
    }
    Ok(())
}

/// Writes the full result in its binary encoding.
pub fn write_binproto(result: &ScanResult, writer: &mut dyn Write) -> Result<()> {
    bincode::serialize_into(writer, result)?;
    Ok(())
}
