//! Thread-safe generator for type IDs.
//!
//! Every registered type gets a numeric id that the chunk refers to in event
//! headers, field descriptors and constant pools. Ids are handed out in
//! registration order starting at 1 and are stable for the lifetime of the
//! session: asking again for a name that already has an id returns that id.
//!
//! # Thread Safety
//!
//! The generator uses `AtomicU64` for the counter and `DashMap` for the
//! name->id table, so value builders on several threads can look ids up
//! without taking the registry lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Numeric identifier of a registered type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u64);

impl TypeId {
    pub fn get(self) -> u64 {
        self.0
    }

    /// The id as written into the chunk.
    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Initial capacity for the name map. The JDK catalog alone is ~30 types.
const INITIAL_NAME_CAPACITY: usize = 64;

/// Generator of [`TypeId`] values keyed by type name.
#[derive(Debug)]
pub struct TypeIdGenerator {
    /// Counter for generating sequential ids
    next_id: AtomicU64,

    /// Mapping from type name -> id
    name_to_id: DashMap<String, TypeId>,
}

impl TypeIdGenerator {
    /// Create a new generator with the counter starting at 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            name_to_id: DashMap::with_capacity(INITIAL_NAME_CAPACITY),
        }
    }

    /// Get or create the id for the given type name.
    pub fn get_or_create(&self, name: &str) -> TypeId {
        if let Some(id) = self.get(name) {
            return id;
        }
        // The entry API makes racing creators agree on a single id; only the
        // winner consumes a counter value.
        *self
            .name_to_id
            .entry(name.to_string())
            .or_insert_with(|| TypeId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    /// Get the id for a name if it has one, without creating it.
    pub fn get(&self, name: &str) -> Option<TypeId> {
        self.name_to_id.get(name).as_deref().copied()
    }

    /// Number of ids handed out so far.
    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }
}

impl Default for TypeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_are_sequential() {
        let gen = TypeIdGenerator::new();

        assert_eq!(gen.get_or_create("byte").get(), 1);
        assert_eq!(gen.get_or_create("char").get(), 2);
        // Looking up an existing name returns the same id
        assert_eq!(gen.get_or_create("byte").get(), 1);
        assert_eq!(gen.len(), 2);
    }

    #[test]
    fn test_get_does_not_create() {
        let gen = TypeIdGenerator::new();
        assert!(gen.get("java.lang.Thread").is_none());
        assert!(gen.is_empty());
        let id = gen.get_or_create("java.lang.Thread");
        assert_eq!(gen.get("java.lang.Thread"), Some(id));
    }

    #[test]
    fn test_concurrent_id_creation() {
        use std::sync::Arc;
        use std::thread;

        let gen = Arc::new(TypeIdGenerator::new());
        let mut handles = vec![];

        // Spawn multiple threads that all try to create ids for the same names
        for _ in 0..8 {
            let gen = Arc::clone(&gen);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    gen.get_or_create(&format!("type.{i}"));
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(gen.len(), 50);
        let mut ids: Vec<_> = (0..50)
            .map(|i| gen.get(&format!("type.{i}")).unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }
}
