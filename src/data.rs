use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use crate::types::{ContentHash, DatasetName};

/// Reference to one fetchable object in the content store.
///
/// Field names follow the store's wire format (`Hash`/`Size`/`Name`) so the
/// same struct decodes link listings and round-trips through the hash cache.
/// Immutable once discovered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafRef {
    /// Content identifier addressing the object.
    #[serde(rename = "Hash")]
    pub hash: ContentHash,
    /// Object size in bytes, when the store reports one.
    #[serde(rename = "Size", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Link name, when the store reports one.
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LeafRef {
    /// Build a bare reference from a content hash.
    pub fn new(hash: impl Into<ContentHash>) -> Self {
        Self {
            hash: hash.into(),
            size: None,
            name: None,
        }
    }

    /// Build a named reference, as found in root and folder link listings.
    pub fn named(hash: impl Into<ContentHash>, name: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            size: None,
            name: Some(name.into()),
        }
    }
}

/// Flat per-dataset list of fetchable leaf references.
///
/// Non-empty once a build succeeds; ordering is new-then-cached and stays
/// stable across cache reloads.
#[derive(Clone, Debug)]
pub struct DatasetIndex {
    /// Logical dataset name.
    pub dataset_name: DatasetName,
    /// Discovered leaf references, in discovery order.
    pub leaf_refs: Vec<LeafRef>,
}

/// All built datasets plus the flattened leaf list the producer cycles over.
///
/// Rebuilt wholesale by `HashTreeIndexer::build_all`; never partially
/// mutated.
#[derive(Clone, Debug, Default)]
pub struct GlobalIndex {
    datasets: IndexMap<DatasetName, DatasetIndex>,
    all_leaf_refs: Vec<LeafRef>,
}

impl GlobalIndex {
    /// Assemble a global index from per-dataset builds, flattening in order.
    pub fn from_datasets(datasets: Vec<DatasetIndex>) -> Self {
        let mut map = IndexMap::with_capacity(datasets.len());
        let mut all_leaf_refs = Vec::new();
        for index in datasets {
            all_leaf_refs.extend(index.leaf_refs.iter().cloned());
            map.insert(index.dataset_name.clone(), index);
        }
        Self {
            datasets: map,
            all_leaf_refs,
        }
    }

    /// Per-dataset indexes, in build order.
    pub fn datasets(&self) -> &IndexMap<DatasetName, DatasetIndex> {
        &self.datasets
    }

    /// Concatenation of every dataset's leaf refs.
    pub fn all_leaf_refs(&self) -> &[LeafRef] {
        &self.all_leaf_refs
    }

    /// Total number of leaf refs across datasets.
    pub fn len(&self) -> usize {
        self.all_leaf_refs.len()
    }

    /// `true` when no dataset contributed any leaf refs.
    pub fn is_empty(&self) -> bool {
        self.all_leaf_refs.is_empty()
    }
}

/// One assembled, word-count-bounded text sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSample {
    /// Assembled sample text.
    pub text: String,
}

impl RawSample {
    /// Number of whitespace-separated words in the sample.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_index_flattens_in_dataset_order() {
        let index = GlobalIndex::from_datasets(vec![
            DatasetIndex {
                dataset_name: "alpha".into(),
                leaf_refs: vec![LeafRef::new("a1"), LeafRef::new("a2")],
            },
            DatasetIndex {
                dataset_name: "beta".into(),
                leaf_refs: vec![LeafRef::new("b1")],
            },
        ]);
        assert_eq!(index.len(), 3);
        let hashes: Vec<&str> = index
            .all_leaf_refs()
            .iter()
            .map(|leaf| leaf.hash.as_str())
            .collect();
        assert_eq!(hashes, vec!["a1", "a2", "b1"]);
        assert!(index.datasets().contains_key("beta"));
    }

    #[test]
    fn leaf_ref_uses_wire_field_names() {
        let leaf = LeafRef {
            hash: "QmLeaf".into(),
            size: Some(42),
            name: Some("0001.json".into()),
        };
        let encoded = serde_json::to_string(&leaf).unwrap();
        assert!(encoded.contains("\"Hash\":\"QmLeaf\""));
        assert!(encoded.contains("\"Size\":42"));
        let decoded: LeafRef = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, leaf);
    }
}
