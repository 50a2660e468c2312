//! On-disk persistence for per-dataset leaf-ref lists.
//!
//! Layout: one JSON file per dataset at `{root}/{dataset}/hashes.json`.
//! A missing file is an empty cache, not an error. The load-modify-save path
//! of a rebuild is guarded by a per-dataset lock so two builds of the same
//! dataset cannot interleave their writes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::constants::index as consts;
use crate::data::LeafRef;
use crate::errors::StreamError;
use crate::types::DatasetName;

/// Per-dataset JSON cache of discovered leaf refs.
pub struct HashCache {
    root: PathBuf,
    locks: Mutex<HashMap<DatasetName, Arc<tokio::sync::Mutex<()>>>>,
}

/// Guard holding one dataset's rebuild lock. Held across the build's awaits.
pub struct DatasetLock {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

impl HashCache {
    /// Open a cache rooted at `root`. The directory is created lazily on
    /// first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the dataset's cache file.
    pub fn entry_path(&self, dataset: &str) -> PathBuf {
        self.root.join(dataset).join(consts::CACHE_FILENAME)
    }

    /// Load the cached leaf refs for `dataset`; missing file means empty.
    pub fn load(&self, dataset: &str) -> Result<Vec<LeafRef>, StreamError> {
        let path = self.entry_path(dataset);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(dataset, "no cache entry, treating as empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        let leaf_refs: Vec<LeafRef> = serde_json::from_slice(&raw)?;
        debug!(dataset, count = leaf_refs.len(), "loaded cached leaf refs");
        Ok(leaf_refs)
    }

    /// Persist `leaf_refs` for `dataset`, replacing any previous entry.
    pub fn save(&self, dataset: &str, leaf_refs: &[LeafRef]) -> Result<PathBuf, StreamError> {
        let path = self.entry_path(dataset);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let encoded = serde_json::to_vec(leaf_refs)?;
        fs::write(&path, encoded)?;
        debug!(dataset, count = leaf_refs.len(), path = %path.display(), "persisted leaf refs");
        Ok(path)
    }

    /// Acquire the exclusive rebuild lock for `dataset`.
    ///
    /// Serializes the load-then-save sequence of concurrent builds of the
    /// same dataset; different datasets never contend.
    pub async fn lock_dataset(&self, dataset: &str) -> DatasetLock {
        let lock = {
            let mut locks = self.locks.lock().expect("cache lock table poisoned");
            Arc::clone(locks.entry(dataset.to_string()).or_default())
        };
        DatasetLock {
            _guard: lock.lock_owned().await,
        }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entry_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HashCache::new(dir.path());
        assert!(cache.load("ArXiv").unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HashCache::new(dir.path());
        let leaf_refs = vec![
            LeafRef::named("QmB", "0002.json"),
            LeafRef::new("QmA"),
            LeafRef::new("QmC"),
        ];
        let path = cache.save("ArXiv", &leaf_refs).unwrap();
        assert!(path.ends_with("ArXiv/hashes.json"));
        assert_eq!(cache.load("ArXiv").unwrap(), leaf_refs);
    }

    #[test]
    fn corrupt_entry_surfaces_a_codec_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HashCache::new(dir.path());
        let path = cache.entry_path("ArXiv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            cache.load("ArXiv"),
            Err(StreamError::CacheCodec(_))
        ));
    }
}
