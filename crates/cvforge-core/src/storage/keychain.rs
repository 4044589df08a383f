use std::collections::BTreeMap;
use std::sync::Mutex;

use keyring::Entry;

use super::{decode_map, encode_map, KeyValueStore, StorageError, WriteBatch};

/// Service name used for keychain entries
const SERVICE_NAME: &str = "cvforge";

/// OS keychain backend.
///
/// The whole map lives in one keychain secret, so a batch is a single
/// `set_password` call and is atomic by construction. The entry is created
/// once and reused; some credential stores do not share state between
/// separately created entries.
pub struct KeyringStore {
    entry: Entry,
    write_lock: Mutex<()>,
}

impl KeyringStore {
    pub fn new(account: &str) -> Result<Self, StorageError> {
        let entry = Entry::new(SERVICE_NAME, account).map_err(keyring_error)?;
        Ok(Self {
            entry,
            write_lock: Mutex::new(()),
        })
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.entry.get_password() {
            Ok(secret) => decode_map(&secret),
            Err(keyring::Error::NoEntry) => Ok(BTreeMap::new()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}

fn keyring_error(e: keyring::Error) -> StorageError {
    match e {
        keyring::Error::NoStorageAccess(inner) => StorageError::Unavailable(inner.to_string()),
        other => StorageError::Keyring(other.to_string()),
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::Corrupt(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        batch.apply_to(&mut map);

        if map.is_empty() {
            return match self.entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(keyring_error(e)),
            };
        }

        self.entry
            .set_password(&encode_map(&map)?)
            .map_err(keyring_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_store() -> KeyringStore {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        KeyringStore::new("test-account").unwrap()
    }

    #[test]
    fn test_write_then_get_through_same_store() {
        let store = mock_store();
        assert_eq!(store.get("k").unwrap(), None);

        store
            .write(WriteBatch::new().put("k", "v").put("other", "w"))
            .unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("other").unwrap().as_deref(), Some("w"));

        store.write(WriteBatch::new().remove("k")).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.get("other").unwrap().as_deref(), Some("w"));
    }

    #[test]
    fn test_emptied_map_deletes_secret() {
        let store = mock_store();
        store.write(WriteBatch::new().put("k", "v")).unwrap();
        store.write(WriteBatch::new().remove("k")).unwrap();

        assert!(matches!(store.entry.get_password(), Err(keyring::Error::NoEntry)));
        // Deleting again is a no-op.
        store.write(WriteBatch::new().remove("k")).unwrap();
    }
}
