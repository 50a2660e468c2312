//! Content-store access: the `ContentStore` trait consumed by the pipeline
//! and the HTTP implementation speaking the store's `api/v0` protocol.
//!
//! Every operation addresses content by an opaque hash passed as the `arg`
//! query parameter. Responses are either a single JSON document
//! (`object/get`) or a raw byte stream read under a chunk budget (`cat`).

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ProducerConfig;
use crate::constants::store as consts;
use crate::data::LeafRef;
use crate::errors::StreamError;

/// Store operations the pipeline depends on.
///
/// Calls are issued concurrently in bounded batches by the indexer and the
/// producer; implementations must tolerate that. Failures are per-request
/// and treated as transient by callers.
pub trait ContentStore: Send + Sync {
    /// Expand one level of the link tree under `reference`.
    ///
    /// Defaults to fetching the node's JSON document and decoding its
    /// `Links` list, so implementations only need `fetch_json`.
    fn object_links(
        &self,
        reference: &LeafRef,
    ) -> impl Future<Output = Result<Vec<LeafRef>, StreamError>> + Send {
        async {
            let document = self.fetch_json(reference).await?;
            let decoded: ObjectGetResponse = serde_json::from_value(document)
                .map_err(|err| StreamError::Parse(err.to_string()))?;
            Ok(decoded.links)
        }
    }

    /// Read the raw content of `reference`, bounded by `max_chunks` reads of
    /// roughly `chunk_size` bytes each.
    fn fetch_bytes(
        &self,
        reference: &LeafRef,
        max_chunks: usize,
        chunk_size: usize,
    ) -> impl Future<Output = Result<Vec<u8>, StreamError>> + Send;

    /// Fetch the full JSON document describing `reference`.
    fn fetch_json(
        &self,
        reference: &LeafRef,
    ) -> impl Future<Output = Result<Value, StreamError>> + Send;
}

/// `object/get` response body; only the link list matters here.
#[derive(Debug, Deserialize)]
struct ObjectGetResponse {
    #[serde(rename = "Links", default)]
    links: Vec<LeafRef>,
}

/// HTTP client for an IPFS-style content store.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct HttpContentStore {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpContentStore {
    /// Build a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StreamError::Transport {
                hash: String::new(),
                reason: err.to_string(),
            })?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            http,
            timeout,
        })
    }

    /// Build a client for `base_url` governed by `config.fetch_timeout`.
    pub fn from_config(
        base_url: impl Into<String>,
        config: &ProducerConfig,
    ) -> Result<Self, StreamError> {
        Self::new(base_url, config.fetch_timeout)
    }

    /// The per-request timeout every store call runs under.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn op_url(&self, op: &str) -> String {
        format!("{}/{}/{}", self.base_url, consts::API_PREFIX, op)
    }

    /// Issue one `api/v0` POST, checking the response status.
    async fn api_post(&self, op: &str, arg: Option<&str>) -> Result<reqwest::Response, StreamError> {
        let hash = arg.unwrap_or("");
        let mut request = self.http.post(self.op_url(op));
        if let Some(arg) = arg {
            request = request.query(&[(consts::ARG_PARAM, arg)]);
        }
        let response = request
            .send()
            .await
            .map_err(|err| StreamError::from_reqwest(hash, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::FetchFailed {
                hash: hash.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Drain a streamed body up to `max_chunks * chunk_size` bytes.
    ///
    /// The transport decides actual read sizes, so the budget bounds the
    /// total rather than slicing exact chunks; the last read may overshoot.
    async fn read_budgeted(
        hash: &str,
        response: reqwest::Response,
        max_chunks: usize,
        chunk_size: usize,
    ) -> Result<Vec<u8>, StreamError> {
        let budget = max_chunks.saturating_mul(chunk_size);
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| StreamError::from_reqwest(hash, err))?;
            body.extend_from_slice(&chunk);
            if budget > 0 && body.len() >= budget {
                break;
            }
        }
        debug!(hash, bytes = body.len(), "streamed content read");
        Ok(body)
    }

    /// Pin `reference` so the store retains its content.
    pub async fn pin_add(&self, reference: &LeafRef) -> Result<Value, StreamError> {
        let response = self.api_post(consts::OP_PIN_ADD, Some(&reference.hash)).await?;
        response
            .json()
            .await
            .map_err(|err| StreamError::from_reqwest(&reference.hash, err))
    }

    /// List pinned objects.
    pub async fn pin_ls(&self) -> Result<Value, StreamError> {
        let response = self.api_post(consts::OP_PIN_LS, None).await?;
        response
            .json()
            .await
            .map_err(|err| StreamError::from_reqwest("", err))
    }

    /// Unpin `reference`.
    pub async fn pin_rm(&self, reference: &LeafRef) -> Result<Value, StreamError> {
        let response = self.api_post(consts::OP_PIN_RM, Some(&reference.hash)).await?;
        response
            .json()
            .await
            .map_err(|err| StreamError::from_reqwest(&reference.hash, err))
    }

    /// Probe the store daemon version.
    pub async fn version(&self) -> Result<Value, StreamError> {
        let response = self.api_post(consts::OP_VERSION, None).await?;
        response
            .json()
            .await
            .map_err(|err| StreamError::from_reqwest("", err))
    }

    /// Upload `bytes` as a new object named `name`, returning the store's
    /// add response (which carries the new content hash).
    pub async fn add_bytes(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Value, StreamError> {
        let name = name.into();
        let part = reqwest::multipart::Part::bytes(bytes).file_name(name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(self.op_url(consts::OP_ADD))
            .multipart(form)
            .send()
            .await
            .map_err(|err| StreamError::from_reqwest(&name, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::FetchFailed {
                hash: name,
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|err| StreamError::from_reqwest(&name, err))
    }
}

impl ContentStore for HttpContentStore {
    async fn fetch_bytes(
        &self,
        reference: &LeafRef,
        max_chunks: usize,
        chunk_size: usize,
    ) -> Result<Vec<u8>, StreamError> {
        let response = self.api_post(consts::OP_CAT, Some(&reference.hash)).await?;
        Self::read_budgeted(&reference.hash, response, max_chunks, chunk_size).await
    }

    async fn fetch_json(&self, reference: &LeafRef) -> Result<Value, StreamError> {
        let response = self
            .api_post(consts::OP_OBJECT_GET, Some(&reference.hash))
            .await?;
        response
            .json()
            .await
            .map_err(|err| StreamError::from_reqwest(&reference.hash, err))
    }
}
