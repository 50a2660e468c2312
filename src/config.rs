use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{index, producer, store};
use crate::types::{DatasetName, TextFieldName};

/// Top-level pipeline configuration shared by the indexer and the producer.
#[derive(Clone, Debug)]
pub struct ProducerConfig {
    /// Dataset names to index and stream from.
    pub datasets: Vec<DatasetName>,
    /// Capacity of the finished-batch queue.
    pub buffer_size: usize,
    /// Samples per tokenized batch.
    pub batch_size: usize,
    /// Words per sample and token columns per batch row.
    pub sequence_length: usize,
    /// Reuse the persisted leaf-ref cache when it already meets the target.
    pub use_cache: bool,
    /// Write merged leaf-ref lists back to the cache after a build.
    pub persist_cache: bool,
    /// Folders expanded per dataset during a build.
    pub num_folders_per_dataset: usize,
    /// Leaf refs accumulated per dataset before a build stops expanding.
    pub num_leaf_target_per_dataset: usize,
    /// Bound on concurrent in-flight store fetches.
    pub max_in_flight_fetches: usize,
    /// How long one store call may stay outstanding before it fails.
    pub fetch_timeout: Duration,
    /// Record attribute holding sample text in decoded leaves.
    pub text_field: TextFieldName,
    /// Seed for the folder shuffle. `None` draws from OS entropy so repeated
    /// runs sample different early folders; tests pin a seed.
    pub shuffle_seed: Option<u64>,
    /// Directory holding per-dataset `hashes.json` caches.
    pub cache_root: PathBuf,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            datasets: Vec::new(),
            buffer_size: producer::DEFAULT_BUFFER_SIZE,
            batch_size: producer::DEFAULT_BATCH_SIZE,
            sequence_length: producer::DEFAULT_SEQUENCE_LENGTH,
            use_cache: true,
            persist_cache: true,
            num_folders_per_dataset: producer::DEFAULT_FOLDERS_PER_DATASET,
            num_leaf_target_per_dataset: producer::DEFAULT_LEAF_TARGET_PER_DATASET,
            max_in_flight_fetches: producer::DEFAULT_MAX_IN_FLIGHT,
            fetch_timeout: Duration::from_secs(store::DEFAULT_TIMEOUT_SECS),
            text_field: producer::DEFAULT_TEXT_FIELD.to_string(),
            shuffle_seed: None,
            cache_root: PathBuf::from(index::DEFAULT_CACHE_DIR),
        }
    }
}

impl ProducerConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), crate::errors::StreamError> {
        if self.batch_size == 0 {
            return Err(crate::errors::StreamError::InvalidArgument(
                "batch_size must be positive".into(),
            ));
        }
        if self.sequence_length == 0 {
            return Err(crate::errors::StreamError::InvalidArgument(
                "sequence_length must be positive".into(),
            ));
        }
        if self.max_in_flight_fetches == 0 {
            return Err(crate::errors::StreamError::InvalidArgument(
                "max_in_flight_fetches must be positive".into(),
            ));
        }
        Ok(())
    }
}
