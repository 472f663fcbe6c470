use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::record::CacheRecord;

/// Durable storage for one `CacheRecord`, one JSON file per cache.
///
/// Loading a missing file yields an empty record; a corrupt file is logged
/// and also treated as empty rather than failing the run. Saves rewrite the
/// full record through a temp-file-then-rename swap so an interrupted write
/// cannot leave a half-written file behind.
///
/// A single process per file is assumed; concurrent invocations may race.
pub struct CacheStore<V> {
    path: PathBuf,
    _value: PhantomData<V>,
}

impl<V: Serialize + DeserializeOwned> CacheStore<V> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _value: PhantomData,
        }
    }

    pub fn load(&self) -> CacheRecord<V> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache file yet, starting empty");
                return CacheRecord::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read cache file, starting empty");
                return CacheRecord::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt cache file, starting empty");
                CacheRecord::default()
            }
        }
    }

    pub fn save(&self, record: &CacheRecord<V>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(record)?;
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, contents)
            .with_context(|| format!("Failed to write cache file {}", temp.display()))?;
        std::fs::rename(&temp, &self.path)
            .with_context(|| format!("Failed to swap cache file into {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store_in(dir: &tempfile::TempDir) -> CacheStore<u32> {
        CacheStore::new(dir.path().join("counts.json"))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let record = store.load();
        assert!(record.last_updated.is_none());
        assert!(record.values.is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut record = CacheRecord::default();
        record.insert("catford", 412);
        record.record_failure("york");
        record.touch(Utc::now());
        store.save(&record).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.value("catford"), Some(&412));
        assert!(loaded.is_attempted("york"));
        assert!(loaded.value("york").is_none());
        assert_eq!(loaded.last_updated, record.last_updated);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&CacheRecord::default()).unwrap();
        assert!(dir.path().join("counts.json").exists());
        assert!(!dir.path().join("counts.json.tmp").exists());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        std::fs::write(&path, "{not json").unwrap();
        let store: CacheStore<u32> = CacheStore::new(path);
        let record = store.load();
        assert!(record.values.is_empty());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store: CacheStore<u32> = CacheStore::new(dir.path().join("nested/deeper/counts.json"));
        store.save(&CacheRecord::default()).unwrap();
        assert!(dir.path().join("nested/deeper/counts.json").exists());
    }
}
