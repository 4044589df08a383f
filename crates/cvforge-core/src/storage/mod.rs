//! Durable key-value storage for client-side state.
//!
//! This module provides:
//! - `KeyValueStore`: the storage seam every backend implements
//! - `WriteBatch`: a set of puts/removes applied all-or-nothing
//! - `MemoryStore`, `FileStore`, `KeyringStore`: the available backends
//!
//! Backends are synchronous. Callers that treat storage as best-effort
//! (the credential store does) log and swallow `StorageError`.

pub mod file;
pub mod keychain;
pub mod memory;

use std::collections::BTreeMap;

use thiserror::Error;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("Keychain error: {0}")]
    Keyring(String),
}

/// A single pending mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put(String, String),
    Remove(String),
}

/// Ordered list of mutations applied atomically by `KeyValueStore::write`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Put(key.into(), value.into()));
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Remove(key.into()));
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the batch to an in-memory map. Backends that persist a whole
    /// map at once (file, keychain) build on this.
    pub fn apply_to(&self, map: &mut BTreeMap<String, String>) {
        for op in &self.ops {
            match op {
                WriteOp::Put(key, value) => {
                    map.insert(key.clone(), value.clone());
                }
                WriteOp::Remove(key) => {
                    map.remove(key);
                }
            }
        }
    }
}

/// Durable string key-value storage.
///
/// `write` must be atomic: after it returns, either every op in the batch
/// is visible or none is.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&self, batch: WriteBatch) -> Result<(), StorageError>;
}

/// Decode a serialized map, treating an empty payload as an empty map.
pub(crate) fn decode_map(contents: &str) -> Result<BTreeMap<String, String>, StorageError> {
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(contents).map_err(|e| StorageError::Corrupt(e.to_string()))
}

pub(crate) fn encode_map(map: &BTreeMap<String, String>) -> Result<String, StorageError> {
    serde_json::to_string_pretty(map).map_err(|e| StorageError::Corrupt(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
