/// Constants used by the content-store HTTP client.
pub mod store {
    /// API path prefix shared by all store operations.
    pub const API_PREFIX: &str = "api/v0";
    /// Streamed raw read of an object's content.
    pub const OP_CAT: &str = "cat";
    /// JSON object/link listing for a node.
    pub const OP_OBJECT_GET: &str = "object/get";
    /// Pin an object so the store retains it.
    pub const OP_PIN_ADD: &str = "pin/add";
    /// List pinned objects.
    pub const OP_PIN_LS: &str = "pin/ls";
    /// Unpin an object.
    pub const OP_PIN_RM: &str = "pin/rm";
    /// Store daemon version probe.
    pub const OP_VERSION: &str = "version";
    /// Upload new content.
    pub const OP_ADD: &str = "add";
    /// Query parameter carrying the content hash.
    pub const ARG_PARAM: &str = "arg";
    /// Default size of one streamed read chunk in bytes.
    pub const DEFAULT_CHUNK_SIZE: usize = 1024;
    /// Default per-request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
}

/// Constants used by hash-tree indexing and the leaf-ref cache.
pub mod index {
    /// Well-known root ("mountain") hash whose links enumerate the datasets.
    pub const ROOT_HASH: &str = "QmSdDg6V9dgpdAFtActs75Qfc36qJtm9y8a7yrQ1rHm7ZX";
    /// Suffix stripped from root link names to obtain dataset names.
    pub const DATASET_NAME_SUFFIX: &str = ".txt";
    /// Maximum dataset-root links scanned while discovering folders.
    pub const MAX_FOLDER_LINKS: usize = 100;
    /// Maximum leaf refs decoded from one folder listing.
    pub const MAX_LEAVES_PER_FOLDER: usize = 50;
    /// Chunk budget for folder-listing reads.
    pub const LISTING_CHUNK_BUDGET: usize = 10;
    /// File name of the per-dataset cached leaf-ref list.
    pub const CACHE_FILENAME: &str = "hashes.json";
    /// Default directory for persisted leaf-ref caches.
    pub const DEFAULT_CACHE_DIR: &str = ".leafstream";
}

/// Constants used by sample assembly and batch production.
pub mod producer {
    /// Chunk budget for a single leaf text read.
    pub const LEAF_CHUNK_BUDGET: usize = 2;
    /// Hard cap on words per sample applied before tokenization.
    ///
    /// Deliberately independent of `sequence_length`; it bounds tokenizer
    /// work even when callers configure long sequences.
    pub const SAMPLE_WORD_CAP: usize = 200;
    /// Default capacity of the finished-batch queue.
    pub const DEFAULT_BUFFER_SIZE: usize = 100;
    /// Default number of samples per batch.
    pub const DEFAULT_BATCH_SIZE: usize = 8;
    /// Default words (and token columns) per sample.
    pub const DEFAULT_SEQUENCE_LENGTH: usize = 128;
    /// Default folders expanded per dataset during a build.
    pub const DEFAULT_FOLDERS_PER_DATASET: usize = 10;
    /// Default leaf refs accumulated per dataset before a build stops.
    pub const DEFAULT_LEAF_TARGET_PER_DATASET: usize = 100;
    /// Default bound on concurrent in-flight fetches.
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;
    /// Default record attribute holding sample text.
    pub const DEFAULT_TEXT_FIELD: &str = "Text";
}
