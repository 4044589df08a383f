use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{KeyValueStore, StorageError, WriteBatch};

/// In-process store. Nothing survives the process; used for tests and
/// sessions started with the `memory` backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        batch.apply_to(&mut entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = MemoryStore::new();
        store.write(WriteBatch::new().put("k", "v")).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.write(WriteBatch::new().remove("k")).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.is_empty());
    }
}
