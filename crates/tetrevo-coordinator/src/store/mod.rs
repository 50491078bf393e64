//! Key-value store shared by all execution units.
//!
//! Every [`SharedStore`] call is one round trip: batch writes and reads go
//! through [`SharedStore::set_many`] and [`SharedStore::get_many`], barrier
//! membership through [`SharedStore::join_set`]. Writes are last-writer-wins
//! per key.

use std::{io, path::PathBuf};

pub use self::{client::*, dir::*, memory::*};

mod client;
mod dir;
mod memory;

/// Errors reported by a [`SharedStore`] or the typed [`StoreClient`] on top of it.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("store I/O failed on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("malformed record `{key}`: {source}")]
    Serde {
        key: String,
        source: serde_json::Error,
    },
    #[display("no record stored under `{key}`")]
    Missing { key: String },
    #[display("record `{key}` is from round {found}, expected round {expected}")]
    StaleRound { key: String, found: u64, expected: u64 },
    #[display("store lock poisoned")]
    Poisoned,
    #[display("{} belongs to run `{found}`, not `{expected}`", path.display())]
    ForeignRun {
        path: PathBuf,
        found: String,
        expected: String,
    },
    #[display("{} holds data of an unnamed run", path.display())]
    NotEmpty { path: PathBuf },
}

/// A key-value service reachable from every execution unit.
pub trait SharedStore: Send + Sync {
    /// Writes every `(key, value)` pair in one round trip.
    fn set_many(&self, entries: &[(String, String)]) -> Result<(), StoreError>;

    /// Reads every key in one round trip; absent keys yield `None`.
    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    /// Adds `member` to the set under `key` and returns the set's size.
    ///
    /// Joining twice is idempotent.
    fn join_set(&self, key: &str, member: &str) -> Result<usize, StoreError>;
}
