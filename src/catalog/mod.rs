//! Catalog Module
//!
//! Table definitions the engine is opened against.
//!
//! ## Responsibilities
//! - Describe each table's schema, tuple size limit and indices
//! - Provide typed records and their tuple string form
//!
//! A table id is the table's position in the catalog; an index id is the
//! index's position in its table. Index 0 is the primary index and is the
//! one used for duplicate detection on insert.

mod record;
mod schema;
pub mod tuple;

pub use record::{Record, Value};
pub use schema::{Field, FieldType, Schema};

use crate::error::{HeapWalError, Result};

/// Key fields of one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    /// Schema positions of the key fields, in key order
    pub key_fields: Vec<usize>,
}

impl IndexDef {
    pub fn new(key_fields: impl Into<Vec<usize>>) -> Self {
        Self {
            key_fields: key_fields.into(),
        }
    }
}

/// Definition of one table
#[derive(Debug, Clone)]
pub struct TableDef {
    /// Table name, also the heap file name
    pub name: String,

    /// Largest serialized tuple the table accepts (heap slot capacity)
    pub max_tuple_size: usize,

    /// Field layout
    pub schema: Schema,

    /// Indices, primary first
    pub indices: Vec<IndexDef>,
}

impl TableDef {
    pub fn new(
        name: impl Into<String>,
        max_tuple_size: usize,
        schema: Schema,
        indices: Vec<IndexDef>,
    ) -> Self {
        Self {
            name: name.into(),
            max_tuple_size,
            schema,
            indices,
        }
    }

    /// The index used for duplicate detection and mutation lookups
    pub fn primary_index(&self) -> &IndexDef {
        &self.indices[0]
    }

    /// True when `field_id` participates in any index key
    pub fn is_key_field(&self, field_id: usize) -> bool {
        self.indices
            .iter()
            .any(|index| index.key_fields.contains(&field_id))
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name == "log" || self.name.contains(['/', '\\']) {
            return Err(HeapWalError::Config(format!(
                "Invalid table name {:?}",
                self.name
            )));
        }
        if self.max_tuple_size == 0 || self.max_tuple_size > u32::MAX as usize {
            return Err(HeapWalError::Config(format!(
                "Table {}: max_tuple_size {} out of range",
                self.name, self.max_tuple_size
            )));
        }
        if self.schema.is_empty() {
            return Err(HeapWalError::Config(format!(
                "Table {} has no fields",
                self.name
            )));
        }
        if self.indices.is_empty() {
            return Err(HeapWalError::Config(format!(
                "Table {} declares no index",
                self.name
            )));
        }
        for index in &self.indices {
            if index.key_fields.is_empty() {
                return Err(HeapWalError::Config(format!(
                    "Table {} has an index without key fields",
                    self.name
                )));
            }
            if let Some(field) = index.key_fields.iter().find(|f| **f >= self.schema.len()) {
                return Err(HeapWalError::Config(format!(
                    "Table {}: index key field {} is not in the schema",
                    self.name, field
                )));
            }
        }
        Ok(())
    }
}

/// All tables known to an engine
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<TableDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table and return its id
    pub fn add_table(&mut self, table: TableDef) -> u32 {
        self.tables.push(table);
        (self.tables.len() - 1) as u32
    }

    /// Builder-style `add_table`
    pub fn with_table(mut self, table: TableDef) -> Self {
        self.add_table(table);
        self
    }

    pub fn table(&self, table_id: u32) -> Result<&TableDef> {
        self.tables
            .get(table_id as usize)
            .ok_or(HeapWalError::UnknownTable(table_id))
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Check every table definition and reject duplicate names
    pub fn validate(&self) -> Result<()> {
        for (i, table) in self.tables.iter().enumerate() {
            table.validate()?;
            if self.tables[..i].iter().any(|t| t.name == table.name) {
                return Err(HeapWalError::Config(format!(
                    "Duplicate table name {}",
                    table.name
                )));
            }
        }
        Ok(())
    }
}
