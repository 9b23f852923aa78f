//! Statements
//!
//! A statement is one single-key operation submitted to the engine. It owns
//! its record; the engine consumes the statement and drops the record when
//! the operation returns.

use crate::catalog::Record;
use crate::wal::OpType;

/// How a statement's transaction is partitioned (carried, not interpreted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionType {
    #[default]
    Single,
    Multiple,
}

/// Fields returned by a select
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// Every field, in schema order
    #[default]
    All,
    /// The listed fields, in the listed order
    Fields(Vec<usize>),
}

/// A single-key operation
///
/// The key is not stored separately: it is the projection of `record`
/// through the key fields of the relevant index, so lookup records only
/// need their key fields set.
#[derive(Debug, Clone)]
pub struct Statement {
    pub transaction_id: u64,
    pub partition_type: PartitionType,
    pub partition_id: u32,
    pub op_type: OpType,
    pub table_id: u32,
    /// Index used by select; mutations always go through index 0
    pub table_index_id: u32,
    /// Full record (insert), key record (select/remove) or key plus new
    /// field values (update)
    pub record: Record,
    /// Update: fields copied from `record` onto the stored tuple
    pub field_ids: Vec<usize>,
    /// Select: fields to return
    pub projection: Projection,
}

impl Statement {
    fn new(transaction_id: u64, op_type: OpType, table_id: u32, record: Record) -> Self {
        Self {
            transaction_id,
            partition_type: PartitionType::Single,
            partition_id: 0,
            op_type,
            table_id,
            table_index_id: 0,
            record,
            field_ids: Vec::new(),
            projection: Projection::All,
        }
    }

    /// Insert `record` into `table_id`
    pub fn insert(transaction_id: u64, table_id: u32, record: Record) -> Self {
        Self::new(transaction_id, OpType::Insert, table_id, record)
    }

    /// Look `key` up through index `table_index_id` and return `projection`
    pub fn select(
        transaction_id: u64,
        table_id: u32,
        table_index_id: u32,
        key: Record,
        projection: Projection,
    ) -> Self {
        Self {
            table_index_id,
            projection,
            ..Self::new(transaction_id, OpType::Select, table_id, key)
        }
    }

    /// Overwrite `field_ids` of the stored tuple with the values in `record`
    pub fn update(transaction_id: u64, table_id: u32, record: Record, field_ids: Vec<usize>) -> Self {
        Self {
            field_ids,
            ..Self::new(transaction_id, OpType::Update, table_id, record)
        }
    }

    /// Remove the tuple whose primary key matches `key`
    pub fn remove(transaction_id: u64, table_id: u32, key: Record) -> Self {
        Self::new(transaction_id, OpType::Remove, table_id, key)
    }

    /// Tag the statement with its partition
    pub fn with_partition(mut self, partition_type: PartitionType, partition_id: u32) -> Self {
        self.partition_type = partition_type;
        self.partition_id = partition_id;
        self
    }
}
