//! Tuple serialization
//!
//! A tuple is the flat string form of a record that the heap files and the
//! log store. Fields appear in schema order separated by single spaces.
//!
//! ## Field Encoding
//! ```text
//! Int     decimal              42
//! Double  shortest round-trip  0.5
//! Text    escaped              hello\sworld
//! Null    marker               \0
//! ```
//! Text escapes: `\` → `\\`, space → `\s`, LF → `\n`, CR → `\r`, so a
//! tuple never contains a raw space inside a field or a line break.

use crate::error::{HeapWalError, Result};
use crate::statement::Projection;

use super::{FieldType, Record, Schema, Value};

const NULL_MARKER: &str = "\\0";

/// Serialize a record to its tuple string
pub fn serialize(record: &Record, schema: &Schema) -> Result<String> {
    record.check(schema)?;

    let mut tuple = String::new();
    for (i, value) in record.values().iter().enumerate() {
        if i > 0 {
            tuple.push(' ');
        }
        write_field(value, &mut tuple);
    }
    Ok(tuple)
}

/// Append one field in its tuple encoding
pub(crate) fn write_field(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str(NULL_MARKER),
        Value::Int(v) => out.push_str(&v.to_string()),
        Value::Double(v) => out.push_str(&v.to_string()),
        Value::Text(v) => escape_into(v, out),
    }
}

/// Parse a tuple string back into a record laid out by `schema`
pub fn deserialize_to_record(tuple: &str, schema: &Schema) -> Result<Record> {
    let tokens: Vec<&str> = tuple.split(' ').collect();
    if tokens.len() != schema.len() {
        return Err(HeapWalError::Serialization(format!(
            "Tuple has {} fields, schema has {}",
            tokens.len(),
            schema.len()
        )));
    }

    let mut values = Vec::with_capacity(tokens.len());
    for (token, field) in tokens.iter().zip(schema.fields()) {
        values.push(parse_field(token, field.field_type)?);
    }
    Ok(Record::from_values(values))
}

/// Render the projected fields of a tuple as plain text, space separated
pub fn deserialize_to_string(tuple: &str, schema: &Schema, projection: &Projection) -> Result<String> {
    let record = deserialize_to_record(tuple, schema)?;

    let field_ids: Vec<usize> = match projection {
        Projection::All => (0..record.len()).collect(),
        Projection::Fields(ids) => ids.clone(),
    };

    let mut out = String::new();
    for (i, field_id) in field_ids.iter().enumerate() {
        let value = record.get(*field_id).ok_or_else(|| {
            HeapWalError::Serialization(format!("Projected field {} is not in the schema", field_id))
        })?;
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&value.to_string());
    }
    Ok(out)
}

fn parse_field(token: &str, field_type: FieldType) -> Result<Value> {
    if token == NULL_MARKER {
        return Ok(Value::Null);
    }
    let value = match field_type {
        FieldType::Int => Value::Int(token.parse().map_err(|e| {
            HeapWalError::Serialization(format!("Invalid int field {:?}: {}", token, e))
        })?),
        FieldType::Double => Value::Double(token.parse().map_err(|e| {
            HeapWalError::Serialization(format!("Invalid double field {:?}: {}", token, e))
        })?),
        FieldType::Text => Value::Text(unescape(token)?),
    };
    Ok(value)
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ' ' => out.push_str("\\s"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

fn unescape(token: &str) -> Result<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            other => {
                return Err(HeapWalError::Serialization(format!(
                    "Invalid escape \\{} in {:?}",
                    other.map(String::from).unwrap_or_default(),
                    token
                )))
            }
        }
    }
    Ok(out)
}
