//! Ordered index
//!
//! `BTreeMap`-backed offset index. Keeps key hashes sorted so callers can
//! walk a hash range.

use std::collections::BTreeMap;
use std::ops::RangeBounds;

use super::OffsetIndex;

/// Key hash → heap offset, ordered by hash
#[derive(Debug, Default)]
pub struct OrderedIndex {
    entries: BTreeMap<u64, u64>,
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries whose key hash falls in `range`, in hash order
    pub fn range<R>(&self, range: R) -> impl Iterator<Item = (u64, u64)> + '_
    where
        R: RangeBounds<u64>,
    {
        self.entries.range(range).map(|(k, v)| (*k, *v))
    }
}

impl OffsetIndex for OrderedIndex {
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
