//! Per-request key-value store.
//!
//! # Responsibilities
//! - Let middleware pass values to later handlers (auth results, parsed
//!   bodies, trace tags)
//! - Stay safe when a handler fans out sub-tasks that read or write it
//!
//! # Design Decisions
//! - DashMap instead of `RwLock<HashMap>`: sharded locking, no poisoning,
//!   and the access pattern is key-disjoint in practice
//! - Values are `Any`, retrieved by type; `get` clones the value out rather
//!   than handing out guards that could deadlock a re-entrant handler

use std::any::Any;

use dashmap::DashMap;

type StoredValue = Box<dyn Any + Send + Sync>;

/// Typed key-value storage scoped to one request.
#[derive(Default)]
pub struct Store {
    entries: DashMap<String, StoredValue>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value under `key`.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Clone out the value under `key`, if present and of type `T`.
    pub fn get<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value().downcast_ref::<T>().cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }
}
