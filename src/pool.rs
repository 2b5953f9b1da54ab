//! Per-type constant pools and their checkpoint serialization.
//!
//! Every pool-backed type owns one pool. Interning assigns a 1-based index
//! that stays valid for the lifetime of the recording, and a pool entry may
//! hold indices into other pools. The checkpoint therefore writes pools in
//! dependency order: a pool comes after every pool its values can reach.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;

use crate::encode;
use crate::error::Result;
use crate::type_ids::TypeId;
use crate::types::ConcreteType;
use crate::value::TypedValue;
use crate::writer::ByteWriter;

/// Interned values of one type.
#[derive(Debug)]
pub struct ConstantPool {
    value_type: ConcreteType,
    indices: HashMap<TypedValue, i64>,
    entries: Vec<TypedValue>,
}

impl ConstantPool {
    pub fn new(value_type: ConcreteType) -> Self {
        Self {
            value_type,
            indices: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn value_type(&self) -> &ConcreteType {
        &self.value_type
    }

    /// Intern `value`, returning it with its pool index set. Null values are
    /// returned unchanged and never stored.
    pub fn add_or_get(&mut self, value: TypedValue) -> TypedValue {
        if value.is_null() {
            return value;
        }
        if let Some(&index) = self.indices.get(&value) {
            return value.with_constant_pool_index(index);
        }
        let index = self.entries.len() as i64 + 1;
        let interned = value.with_constant_pool_index(index);
        self.indices.insert(interned.clone(), index);
        self.entries.push(interned.clone());
        tracing::trace!(
            "Interned {} #{} ({} entries)",
            self.value_type.name(),
            index,
            self.entries.len()
        );
        interned
    }

    /// Entry with the given 1-based index.
    pub fn get(&self, index: i64) -> Option<&TypedValue> {
        if index < 1 {
            return None;
        }
        self.entries.get(index as usize - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in index order.
    pub fn entries(&self) -> &[TypedValue] {
        &self.entries
    }
}

/// All constant pools of a recording, keyed by type id.
#[derive(Debug, Default)]
pub struct ConstantPools {
    pools: DashMap<TypeId, ConstantPool>,
}

impl ConstantPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the (empty) pool of `value_type` if it does not exist.
    pub fn register(&self, value_type: &ConcreteType) {
        self.pools
            .entry(value_type.id())
            .or_insert_with(|| ConstantPool::new(value_type.clone()));
    }

    /// Intern `value` in the pool of its type.
    pub fn add_or_get(&self, value: TypedValue) -> TypedValue {
        if value.is_null() {
            return value;
        }
        let value_type = value.value_type().clone();
        self.pools
            .entry(value_type.id())
            .or_insert_with(|| ConstantPool::new(value_type))
            .add_or_get(value)
    }

    pub fn len_of(&self, id: TypeId) -> usize {
        self.pools.get(&id).map(|p| p.len()).unwrap_or(0)
    }

    pub fn get(&self, id: TypeId, index: i64) -> Option<TypedValue> {
        self.pools.get(&id).and_then(|p| p.get(index).cloned())
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Pool types in dependency order: a type comes after every pooled type
    /// reachable through its fields. Cycles are cut at the first revisit.
    pub fn ordered(&self) -> Vec<ConcreteType> {
        let mut roots: Vec<ConcreteType> = self
            .pools
            .iter()
            .map(|p| p.value_type().clone())
            .collect();
        roots.sort_by_key(|t| t.id());
        let pooled: HashSet<TypeId> = roots.iter().map(|t| t.id()).collect();

        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(roots.len());
        for root in &roots {
            visit(root, &pooled, &mut visited, &mut order);
        }
        order
    }

    /// Write the pool count followed by every non-empty pool, in dependency
    /// order. Returns the number of pools written.
    pub fn write_to(&self, w: &mut ByteWriter) -> Result<usize> {
        let snapshot: Vec<(TypeId, Vec<TypedValue>)> = self
            .ordered()
            .iter()
            .filter_map(|t| {
                let pool = self.pools.get(&t.id())?;
                if pool.is_empty() {
                    return None;
                }
                let entries = pool.entries().to_vec();
                Some((t.id(), entries))
            })
            .collect();

        w.write_len(snapshot.len());
        for (id, entries) in &snapshot {
            w.write_long(id.as_i64()).write_len(entries.len());
            for entry in entries {
                w.write_long(entry.constant_pool_index().unwrap_or_default());
                encode::write_pool_entry(w, entry)?;
            }
        }
        Ok(snapshot.len())
    }
}

fn visit(
    value_type: &ConcreteType,
    pooled: &HashSet<TypeId>,
    visited: &mut HashSet<TypeId>,
    order: &mut Vec<ConcreteType>,
) {
    if !visited.insert(value_type.id()) {
        return;
    }
    for field in value_type.fields() {
        // Unresolved references cannot hold values yet.
        if let Ok(dependency) = field.field_type().concrete() {
            visit(&dependency, pooled, visited, order);
        }
    }
    if pooled.contains(&value_type.id()) {
        order.push(value_type.clone());
    }
}
