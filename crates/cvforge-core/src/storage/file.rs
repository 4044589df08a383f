use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::{decode_map, encode_map, KeyValueStore, StorageError, WriteBatch};

/// JSON-object file on disk.
///
/// Writes go to a sibling temp file which is then renamed over the
/// original, so a crash mid-write leaves the previous contents intact.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        decode_map(&contents)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for FileStore {
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
            Err(StorageError::Corrupt(reason)) => {
                warn!(path = ?self.path, %reason, "Storage file corrupt, starting over");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        batch.apply_to(&mut map);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, encode_map(&map)?)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = ?self.path, keys = map.len(), "Storage file written");
        Ok(())
    }
}
