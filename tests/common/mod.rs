//! Shared fixtures: an in-memory content store and a small mountain tree.
#![allow(dead_code)] // not every suite touches every fixture

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use leafstream::{ContentStore, LeafRef, StreamError};

/// Root hash of the fixture tree.
pub const ROOT: &str = "QmMockMountain";

/// In-memory content store with per-call accounting.
///
/// Clones share the same tree and counters, so a copy handed to a producer
/// still reports calls to the test.
#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<MockStoreInner>,
}

#[derive(Default)]
struct MockStoreInner {
    links: HashMap<String, Vec<LeafRef>>,
    bodies: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

/// Route `tracing` output through a subscriber honoring `RUST_LOG`.
/// Idempotent; every suite that builds a store gets log capture for free.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl MockStore {
    pub fn builder() -> MockStoreBuilder {
        init_tracing();
        MockStoreBuilder::default()
    }

    /// Total store operations issued since the last reset.
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::Relaxed)
    }

    pub fn reset_calls(&self) {
        self.inner.calls.store(0, Ordering::Relaxed);
    }

    fn record_call(&self, hash: &str) -> Result<(), StreamError> {
        self.inner.calls.fetch_add(1, Ordering::Relaxed);
        if self.inner.failing.contains(hash) {
            return Err(StreamError::FetchFailed {
                hash: hash.to_string(),
                status: 500,
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockStoreBuilder {
    inner: MockStoreInner,
}

impl MockStoreBuilder {
    pub fn links(mut self, hash: &str, links: Vec<LeafRef>) -> Self {
        self.inner.links.insert(hash.to_string(), links);
        self
    }

    pub fn body(mut self, hash: &str, body: impl Into<Vec<u8>>) -> Self {
        self.inner.bodies.insert(hash.to_string(), body.into());
        self
    }

    pub fn failing(mut self, hash: &str) -> Self {
        self.inner.failing.insert(hash.to_string());
        self
    }

    pub fn build(self) -> MockStore {
        MockStore {
            inner: Arc::new(self.inner),
        }
    }
}

// `object_links` is left to its default, so every link walk in these suites
// exercises the fetch-json decode path.
impl ContentStore for MockStore {
    async fn fetch_bytes(
        &self,
        reference: &LeafRef,
        _max_chunks: usize,
        _chunk_size: usize,
    ) -> Result<Vec<u8>, StreamError> {
        self.record_call(&reference.hash)?;
        self.inner
            .bodies
            .get(&reference.hash)
            .cloned()
            .ok_or_else(|| StreamError::FetchFailed {
                hash: reference.hash.clone(),
                status: 404,
            })
    }

    async fn fetch_json(&self, reference: &LeafRef) -> Result<Value, StreamError> {
        self.record_call(&reference.hash)?;
        let links = self
            .inner
            .links
            .get(&reference.hash)
            .cloned()
            .unwrap_or_default();
        Ok(json!({ "Links": links }))
    }
}

/// Text of `words` distinct words, unique to `tag`.
pub fn words(tag: &str, words: usize) -> String {
    (0..words)
        .map(|i| format!("{tag}_w{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// JSON leaf body carrying a `Text` attribute of `word_count` words.
pub fn leaf_body(tag: &str, word_count: usize) -> Vec<u8> {
    serde_json::to_vec(&json!({ "Text": words(tag, word_count) })).unwrap()
}

/// Concatenated-fragment folder listing for the given leaf hashes.
pub fn listing(leaf_hashes: &[&str]) -> Vec<u8> {
    let records: Vec<String> = leaf_hashes
        .iter()
        .map(|hash| format!(r#"{{"Name":"{hash}.json","Hash":"{hash}","Size":100}}"#))
        .collect();
    format!("[{}]", records.join(",")).into_bytes()
}

/// Mountain tree with one dataset (`ArXiv`), two folders of three leaves
/// each, every leaf holding at least 130 words of text.
///
/// Hierarchy: root → dataset root → link node → folders; folder bodies are
/// leaf listings; leaf bodies are JSON records with a `Text` field.
pub fn mountain_fixture() -> MockStore {
    let leaf_hashes = ["QmLeafA", "QmLeafB", "QmLeafC", "QmLeafD", "QmLeafE", "QmLeafF"];
    let mut builder = MockStore::builder()
        .links(ROOT, vec![LeafRef::named("QmArXivRoot", "ArXiv.txt")])
        .links(
            "QmArXivRoot",
            vec![LeafRef::named("QmLinkNode", "folder_links")],
        )
        .links(
            "QmLinkNode",
            vec![
                LeafRef::named("QmFolder1", "folder_0001"),
                LeafRef::named("QmFolder2", "folder_0002"),
            ],
        )
        .body("QmFolder1", listing(&leaf_hashes[..3]))
        .body("QmFolder2", listing(&leaf_hashes[3..]));
    for hash in leaf_hashes {
        builder = builder.body(hash, leaf_body(hash, 130));
    }
    builder.build()
}

/// The fixture's root reference, for `HashTreeIndexer::with_root`.
pub fn root_ref() -> LeafRef {
    LeafRef::named(ROOT, "mountain")
}
