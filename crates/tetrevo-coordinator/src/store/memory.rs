use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use super::{SharedStore, StoreError};

/// Round trips served by a [`MemoryStore`], by kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub sets: u64,
    pub gets: u64,
    pub joins: u64,
}

impl StoreStats {
    #[must_use]
    pub fn round_trips(&self) -> u64 {
        self.sets + self.gets + self.joins
    }
}

#[derive(Debug, Default)]
struct Tables {
    values: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// In-process store for single-process runs and for in-process peer units.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    sets: AtomicU64,
    gets: AtomicU64,
    joins: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            sets: self.sets.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
        }
    }
}

impl SharedStore for MemoryStore {
    fn set_many(&self, entries: &[(String, String)]) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        for (key, value) in entries {
            tables.values.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(keys.iter().map(|key| tables.values.get(key).cloned()).collect())
    }

    fn join_set(&self, key: &str, member: &str) -> Result<usize, StoreError> {
        self.joins.fetch_add(1, Ordering::Relaxed);
        let mut tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        let set = tables.sets.entry(key.to_owned()).or_default();
        set.insert(member.to_owned());
        Ok(set.len())
    }
}
