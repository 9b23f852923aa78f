//! Hash index
//!
//! `HashMap`-backed offset index for O(1) equality lookups.

use std::collections::HashMap;

use super::OffsetIndex;

/// Key hash → heap offset, unordered
#[derive(Debug, Default)]
pub struct HashIndex {
    entries: HashMap<u64, u64>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OffsetIndex for HashIndex {
    fn exists(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    fn at(&self, key: u64) -> Option<u64> {
        self.entries.get(&key).copied()
    }

    fn insert(&mut self, key: u64, offset: u64) {
        self.entries.insert(key, offset);
    }

    fn erase(&mut self, key: u64) -> bool {
        self.entries.remove(&key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
