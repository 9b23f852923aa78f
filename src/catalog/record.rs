//! Typed records

use std::fmt;

use crate::error::{HeapWalError, Result};

use super::{tuple, FieldType, IndexDef, Schema};

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Double(f64),
    Text(String),
}

impl Value {
    /// Whether this value may be stored in a field of `field_type`
    pub fn fits(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (Value::Null, _)
                | (Value::Int(_), FieldType::Int)
                | (Value::Double(_), FieldType::Double)
                | (Value::Text(_), FieldType::Text)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// An ordered set of field values laid out by a table schema.
///
/// Records are owned values: a statement hands its record to the engine,
/// which drops it when the operation returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// A record of `len` null fields
    pub fn with_len(len: usize) -> Self {
        Self {
            values: vec![Value::Null; len],
        }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// A record carrying only `key` at `field_id`, sized for `schema`.
    /// Used for select/remove/update lookups.
    pub fn key(schema: &Schema, field_id: usize, key: impl Into<Value>) -> Self {
        let mut record = Self::with_len(schema.len());
        record.set(field_id, key);
        record
    }

    pub fn get(&self, field_id: usize) -> Option<&Value> {
        self.values.get(field_id)
    }

    /// Set a field; returns false when `field_id` is out of range
    pub fn set(&mut self, field_id: usize, value: impl Into<Value>) -> bool {
        match self.values.get_mut(field_id) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Copy field `field_id` from `other` into this record
    pub fn set_from(&mut self, field_id: usize, other: &Record) -> bool {
        match (self.values.get_mut(field_id), other.values.get(field_id)) {
            (Some(slot), Some(value)) => {
                *slot = value.clone();
                true
            }
            _ => false,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Projection of the index key fields in tuple encoding, space
    /// separated. Text is escaped and null has its own marker, so distinct
    /// keys never share a projection. Missing fields project as null.
    pub fn key_string(&self, index: &IndexDef) -> String {
        let mut key = String::new();
        for (i, field_id) in index.key_fields.iter().enumerate() {
            if i > 0 {
                key.push(' ');
            }
            tuple::write_field(self.values.get(*field_id).unwrap_or(&Value::Null), &mut key);
        }
        key
    }

    /// Check field count and field types against `schema`
    pub fn check(&self, schema: &Schema) -> Result<()> {
        if self.values.len() != schema.len() {
            return Err(HeapWalError::Serialization(format!(
                "Record has {} fields, schema has {}",
                self.values.len(),
                schema.len()
            )));
        }
        for (field_id, (value, field)) in self.values.iter().zip(schema.fields()).enumerate() {
            if !value.fits(field.field_type) {
                return Err(HeapWalError::Serialization(format!(
                    "Field {} ({}) expects {:?}, got {:?}",
                    field_id, field.name, field.field_type, value
                )));
            }
        }
        Ok(())
    }
}
