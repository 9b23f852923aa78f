//! Workload Module
//!
//! YCSB-style statement generator used by the benchmark binary and tests.
//!
//! ## Shape
//! - One table, `usertable`: `ycsb_key` (int, primary index) and
//!   `ycsb_value` (text of `sz_value` characters)
//! - Keys are split into `num_parts` contiguous partition ranges
//! - Load phase: one insert per key, partitions interleaved
//! - Run phase: `num_txns` statements; each picks a partition round-robin,
//!   a Zipf-distributed key inside it, and is an update with probability
//!   `per_writes`, otherwise a select

mod zipf;

pub use zipf::ZipfGenerator;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::{Catalog, FieldType, IndexDef, Record, Schema, TableDef, Value};
use crate::error::{HeapWalError, Result};
use crate::statement::{PartitionType, Projection, Statement};

/// Table id of `usertable` in the generated catalog
pub const USERTABLE: u32 = 0;

/// Field ids of `usertable`
pub const KEY_FIELD: usize = 0;
pub const VALUE_FIELD: usize = 1;

/// YCSB workload parameters
#[derive(Debug, Clone)]
pub struct YcsbConfig {
    /// Total keys loaded
    pub num_keys: u64,
    /// Statements in the run phase
    pub num_txns: u64,
    /// Partitions the key space is split into
    pub num_parts: u32,
    /// Characters per value
    pub sz_value: usize,
    /// Fraction of run-phase statements that are updates
    pub per_writes: f64,
    /// Zipf skew of key popularity, in `[0, 1)`
    pub skew: f64,
    /// RNG seed, for reproducible runs
    pub seed: u64,
}

impl Default for YcsbConfig {
    fn default() -> Self {
        Self {
            num_keys: 10_000,
            num_txns: 10_000,
            num_parts: 1,
            sz_value: 100,
            per_writes: 0.1,
            skew: 0.5,
            seed: 0x5eed,
        }
    }
}

/// Generates YCSB load and run statements
pub struct YcsbBenchmark {
    config: YcsbConfig,
    catalog: Catalog,
    zipf: ZipfGenerator,
    rng: StdRng,
    /// Last statement id handed out (doubles as transaction id)
    statement_id: u64,
}

impl YcsbBenchmark {
    pub fn new(config: YcsbConfig) -> Result<Self> {
        if config.num_parts == 0 || config.num_keys < config.num_parts as u64 {
            return Err(HeapWalError::Config(format!(
                "{} keys cannot fill {} partitions",
                config.num_keys, config.num_parts
            )));
        }
        if config.sz_value == 0 {
            return Err(HeapWalError::Config("sz_value must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&config.per_writes) {
            return Err(HeapWalError::Config(format!(
                "per_writes {} not in [0, 1]",
                config.per_writes
            )));
        }

        let zipf = ZipfGenerator::new(config.num_keys / config.num_parts as u64, config.skew)?;
        let catalog = Self::usertable_catalog(config.sz_value);
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            catalog,
            zipf,
            rng,
            statement_id: 0,
        })
    }

    /// Catalog holding `usertable`, sized for values of `sz_value` bytes
    pub fn usertable_catalog(sz_value: usize) -> Catalog {
        let schema = Schema::new()
            .field("ycsb_key", FieldType::Int)
            .field("ycsb_value", FieldType::Text);
        // Widest i64 is 20 characters, plus the separator.
        let max_tuple_size = sz_value + 21;
        Catalog::new().with_table(TableDef::new(
            "usertable",
            max_tuple_size,
            schema,
            vec![IndexDef::new([KEY_FIELD])],
        ))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &YcsbConfig {
        &self.config
    }

    /// Load phase: one insert for every key, partitions interleaved
    pub fn dataset(&mut self) -> Vec<Statement> {
        let part_range = self.part_range();
        let mut statements = Vec::with_capacity((part_range * self.config.num_parts as u64) as usize);

        for key_itr in 0..part_range {
            for part in 0..self.config.num_parts {
                let key = part_range * part as u64 + key_itr;
                let value: String = (&mut self.rng)
                    .sample_iter(&Alphanumeric)
                    .take(self.config.sz_value)
                    .map(char::from)
                    .collect();
                let record = Record::from_values(vec![Value::Int(key as i64), Value::Text(value)]);

                let id = self.next_id();
                statements.push(
                    Statement::insert(id, USERTABLE, record).with_partition(PartitionType::Single, part),
                );
            }
        }

        statements
    }

    /// Run phase: Zipf-keyed mix of updates and selects
    pub fn workload(&mut self) -> Vec<Statement> {
        let part_range = self.part_range();
        let updated_value = "x".repeat(self.config.sz_value);
        let mut statements = Vec::with_capacity(self.config.num_txns as usize);

        for txn_itr in 0..self.config.num_txns {
            let part = (txn_itr % self.config.num_parts as u64) as u32;
            let key = part_range * part as u64 + self.zipf.sample(&mut self.rng);
            let is_write = self.rng.gen::<f64>() < self.config.per_writes;
            let id = self.next_id();

            let statement = if is_write {
                let record = Record::from_values(vec![
                    Value::Int(key as i64),
                    Value::Text(updated_value.clone()),
                ]);
                Statement::update(id, USERTABLE, record, vec![VALUE_FIELD])
            } else {
                let key_record = Record::from_values(vec![Value::Int(key as i64), Value::Null]);
                Statement::select(id, USERTABLE, 0, key_record, Projection::All)
            };
            statements.push(statement.with_partition(PartitionType::Single, part));
        }

        statements
    }

    fn part_range(&self) -> u64 {
        self.config.num_keys / self.config.num_parts as u64
    }

    fn next_id(&mut self) -> u64 {
        self.statement_id += 1;
        self.statement_id
    }
}
