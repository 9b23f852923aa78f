//! Index Module
//!
//! Maps 64-bit key hashes to heap offsets.
//!
//! ## Responsibilities
//! - Equality lookup from a key hash to the slot holding the tuple
//! - Lazy deletion: erasing an entry leaves the heap slot untouched
//!
//! ## Key Hashing
//! Keys are the string projection of an index's key fields, hashed with
//! XXH3-64. The projection uses the tuple encoding (escaped text, a null
//! marker), so it is injective; only the hash can collide. Distinct keys
//! that hash identically alias to one index entry; collisions are neither
//! detected nor resolved.

mod hash;
mod ordered;

pub use hash::HashIndex;
pub use ordered::OrderedIndex;

/// Offset-index operations the engine relies on
pub trait OffsetIndex: Send {
    /// Whether `key` has an entry
    fn exists(&self, key: u64) -> bool;

    /// Offset stored for `key`
    fn at(&self, key: u64) -> Option<u64>;

    /// Insert or replace the entry for `key`
    fn insert(&mut self, key: u64, offset: u64);

    /// Remove the entry for `key`; returns whether one existed
    fn erase(&mut self, key: u64) -> bool;

    /// Number of entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    fn clear(&mut self);
}

/// Backing structure for the indices of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// Unordered hash map
    #[default]
    Hash,
    /// Ordered map over key hashes
    Ordered,
}

impl IndexKind {
    /// Create an empty index of this kind
    pub fn build(self) -> Box<dyn OffsetIndex> {
        match self {
            IndexKind::Hash => Box::new(HashIndex::new()),
            IndexKind::Ordered => Box::new(OrderedIndex::new()),
        }
    }
}

/// Hash a key projection to an index key
pub fn hash_key(key: &str) -> u64 {
    twox_hash::xxh3::hash64(key.as_bytes())
}
