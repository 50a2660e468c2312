//! Hash-tree indexing: walking the root → dataset → folder → leaf link
//! hierarchy into flat, cacheable per-dataset leaf-ref lists.
//!
//! Failure scope is kept as small as possible: a folder that cannot be
//! fetched or parsed is skipped with a warning, and a build only fails when
//! both the network walk and the on-disk cache yield nothing.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use futures::future::join_all;

use crate::cache::HashCache;
use crate::config::ProducerConfig;
use crate::constants::{index as consts, store as store_consts};
use crate::data::{DatasetIndex, GlobalIndex, LeafRef};
use crate::errors::StreamError;
use crate::partition::{partition, RemainderPolicy};
use crate::store::ContentStore;
use crate::types::DatasetName;

/// Builds flat leaf-ref lists by walking the store's link hierarchy.
pub struct HashTreeIndexer<S> {
    store: S,
    cache: HashCache,
    root: LeafRef,
    roots: OnceCell<IndexMap<DatasetName, LeafRef>>,
    num_folders: usize,
    num_leaf_target: usize,
    use_cache: bool,
    persist_cache: bool,
    max_in_flight: usize,
    shuffle_seed: Option<u64>,
}

impl<S: ContentStore> HashTreeIndexer<S> {
    /// Build an indexer over `store`, configured by `config`, rooted at the
    /// well-known mountain hash.
    pub fn new(store: S, config: &ProducerConfig) -> Self {
        Self {
            store,
            cache: HashCache::new(config.cache_root.clone()),
            root: LeafRef::named(consts::ROOT_HASH, "mountain"),
            roots: OnceCell::new(),
            num_folders: config.num_folders_per_dataset,
            num_leaf_target: config.num_leaf_target_per_dataset,
            use_cache: config.use_cache,
            persist_cache: config.persist_cache,
            max_in_flight: config.max_in_flight_fetches.max(1),
            shuffle_seed: config.shuffle_seed,
        }
    }

    /// Override the root reference (mock stores and private deployments).
    pub fn with_root(mut self, root: LeafRef) -> Self {
        self.root = root;
        self.roots = OnceCell::new();
        self
    }

    /// Dataset name → dataset-root reference, resolved from the root's links
    /// once per indexer and reused by later builds.
    pub async fn dataset_roots(&self) -> Result<&IndexMap<DatasetName, LeafRef>, StreamError> {
        self.roots
            .get_or_try_init(|| async {
                let links = self.store.object_links(&self.root).await?;
                let mut roots = IndexMap::with_capacity(links.len());
                for link in links {
                    let Some(name) = link.name.as_deref() else {
                        continue;
                    };
                    let dataset = name.trim_end_matches(consts::DATASET_NAME_SUFFIX);
                    roots.insert(dataset.to_string(), link.clone());
                }
                debug!(datasets = roots.len(), "resolved dataset root mapping");
                Ok(roots)
            })
            .await
    }

    /// Names of every dataset the root mapping exposes.
    pub async fn available_datasets(&self) -> Result<Vec<DatasetName>, StreamError> {
        Ok(self.dataset_roots().await?.keys().cloned().collect())
    }

    /// Build every named dataset concurrently and flatten the results.
    ///
    /// A dataset whose build fails is excluded with a warning; the call only
    /// errors when no dataset contributes any leaf refs, since the producer
    /// cannot start from an empty index.
    pub async fn build_all(&self, datasets: &[DatasetName]) -> Result<GlobalIndex, StreamError> {
        let builds = join_all(
            datasets
                .iter()
                .map(|dataset| self.build_dataset(dataset.as_str())),
        )
        .await;

        let mut built = Vec::with_capacity(datasets.len());
        for (dataset, result) in datasets.iter().zip(builds) {
            match result {
                Ok(leaf_refs) => built.push(DatasetIndex {
                    dataset_name: dataset.clone(),
                    leaf_refs,
                }),
                Err(err) => warn!(dataset = %dataset, error = %err, "dataset excluded from index"),
            }
        }

        let index = GlobalIndex::from_datasets(built);
        if index.is_empty() {
            return Err(StreamError::IndexBuild {
                dataset: "*".into(),
                reason: "no dataset produced leaf refs".into(),
            });
        }
        Ok(index)
    }

    /// Build the flat leaf-ref list for one dataset.
    ///
    /// Warm path: when the cache already holds `num_leaf_target` refs, they
    /// are returned immediately with no network traffic. Otherwise folders
    /// are expanded in shuffled order until enough new refs accumulate, the
    /// merged new-then-cached list is persisted, and the first
    /// `num_leaf_target` entries are returned.
    pub async fn build_dataset(&self, dataset: &str) -> Result<Vec<LeafRef>, StreamError> {
        let _lock = self.cache.lock_dataset(dataset).await;

        let cached = if self.use_cache {
            match self.cache.load(dataset) {
                Ok(cached) => cached,
                Err(err) => {
                    warn!(dataset, error = %err, "unreadable cache entry, rebuilding");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        if !cached.is_empty() && cached.len() >= self.num_leaf_target {
            debug!(dataset, count = self.num_leaf_target, "served build from cache");
            return Ok(cached[..self.num_leaf_target].to_vec());
        }

        let roots = self.dataset_roots().await?;
        let dataset_root = roots
            .get(dataset)
            .ok_or_else(|| StreamError::IndexBuild {
                dataset: dataset.to_string(),
                reason: "dataset is absent from the root mapping".into(),
            })?
            .clone();

        let mut folders = self.folder_refs(&dataset_root).await?;
        let mut rng = match self.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        // Shuffle before taking the head so repeated short builds do not
        // keep sampling the same early folders.
        folders.shuffle(&mut rng);
        folders.truncate(self.num_folders);

        let mut new_refs: Vec<LeafRef> = Vec::new();
        for folder in &folders {
            match self.folder_leaf_refs(folder).await {
                Ok(leaf_refs) => {
                    debug!(dataset, folder = %folder.hash, count = leaf_refs.len(), "folder expanded");
                    new_refs.extend(leaf_refs);
                }
                Err(err) => {
                    warn!(dataset, folder = %folder.hash, error = %err, "skipping folder");
                }
            }
            if new_refs.len() + cached.len() >= self.num_leaf_target {
                break;
            }
        }

        // New refs first: freshly discovered content is preferred for
        // variety when the combined list is truncated.
        let mut combined = new_refs;
        combined.extend(cached);
        if combined.is_empty() {
            return Err(StreamError::IndexBuild {
                dataset: dataset.to_string(),
                reason: "network walk and cache both yielded nothing".into(),
            });
        }

        if self.persist_cache {
            if let Err(err) = self.cache.save(dataset, &combined) {
                warn!(dataset, error = %err, "failed to persist leaf refs");
            }
        }

        combined.truncate(self.num_leaf_target);
        Ok(combined)
    }

    /// Expand a dataset root into folder references.
    ///
    /// The root's first `MAX_FOLDER_LINKS` links each point at an
    /// intermediate node whose links are the folders; those nodes are
    /// expanded concurrently in batches bounded by the in-flight limit.
    async fn folder_refs(&self, dataset_root: &LeafRef) -> Result<Vec<LeafRef>, StreamError> {
        let mut links = self.store.object_links(dataset_root).await?;
        links.truncate(consts::MAX_FOLDER_LINKS);

        let mut folders = Vec::new();
        for batch in partition(
            &links,
            Some(self.max_in_flight),
            None,
            RemainderPolicy::Append,
        )? {
            let expansions = join_all(batch.iter().map(|link| self.store.object_links(link))).await;
            for (link, expansion) in batch.iter().zip(expansions) {
                match expansion {
                    Ok(children) => folders.extend(children),
                    Err(err) => {
                        warn!(link = %link.hash, error = %err, "skipping unexpandable link");
                    }
                }
            }
        }
        Ok(folders)
    }

    /// Fetch and decode one folder's leaf listing, capped per folder.
    async fn folder_leaf_refs(&self, folder: &LeafRef) -> Result<Vec<LeafRef>, StreamError> {
        let body = self
            .store
            .fetch_bytes(
                folder,
                consts::LISTING_CHUNK_BUDGET,
                store_consts::DEFAULT_CHUNK_SIZE,
            )
            .await?;
        let mut leaf_refs = parse_leaf_listing(&body);
        leaf_refs.truncate(consts::MAX_LEAVES_PER_FOLDER);
        Ok(leaf_refs)
    }
}

/// Decode a folder's leaf listing.
///
/// The store emits listings as concatenated JSON object fragments rather
/// than one document, so the body is split on `"},"`, each piece is patched
/// back into a standalone object, and pieces that still fail to decode are
/// skipped. The splitting rule is store-format-dependent; validate it
/// against the live store before trusting new listing shapes.
pub fn parse_leaf_listing(body: &[u8]) -> Vec<LeafRef> {
    let text = String::from_utf8_lossy(body);
    let mut leaf_refs = Vec::new();
    for piece in text.split("},") {
        let Some(fragment) = patch_fragment(piece) else {
            continue;
        };
        match serde_json::from_str::<LeafRef>(&fragment) {
            Ok(leaf) => leaf_refs.push(leaf),
            Err(err) => debug!(error = %err, "skipping undecodable listing fragment"),
        }
    }
    leaf_refs
}

/// Restore a split listing piece to a standalone JSON object.
fn patch_fragment(piece: &str) -> Option<String> {
    let trimmed = piece
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut fragment = trimmed.to_string();
    if !fragment.ends_with('}') {
        fragment.push('}');
    }
    Some(fragment)
}
