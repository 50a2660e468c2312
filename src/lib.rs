#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Sample assembly from leaf contents.
pub mod assemble;
/// On-disk persistence of per-dataset leaf-ref lists.
pub mod cache;
/// Pipeline configuration.
pub mod config;
/// Centralized constants used across the store client, indexer, and producer.
pub mod constants;
/// Leaf references, dataset indexes, and sample types.
pub mod data;
mod hash;
/// Hash-tree indexing into flat leaf-ref lists.
pub mod index;
/// Deterministic list partitioning for fetch batches.
pub mod partition;
/// Background batch production and the bounded batch queue.
pub mod producer;
/// Content-store interface and HTTP client.
pub mod store;
/// Tokenizer interface and batch container.
pub mod tokenize;
/// Shared type aliases.
pub mod types;

mod errors;

pub use assemble::SampleAssembler;
pub use cache::HashCache;
pub use config::ProducerConfig;
pub use data::{DatasetIndex, GlobalIndex, LeafRef, RawSample};
pub use errors::StreamError;
pub use index::HashTreeIndexer;
pub use partition::{partition, RemainderPolicy};
pub use producer::{BatchProducer, CycleOutcome, DatasetQueue, ProducerEngine};
pub use store::{ContentStore, HttpContentStore};
pub use tokenize::{HashingTokenizer, TokenizedBatch, Tokenizer};
pub use types::{ContentHash, DatasetName, TextFieldName, TokenId};
