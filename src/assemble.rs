//! Sample assembly: turning leaf contents into fixed-word-count text.
//!
//! A sample starts at one leaf and wraps forward through the flat leaf list
//! until enough words accumulate, then is truncated to an exact word count.

use serde_json::Value;
use tracing::debug;

use crate::constants::{producer as consts, store as store_consts};
use crate::data::{LeafRef, RawSample};
use crate::errors::StreamError;
use crate::store::ContentStore;
use crate::types::TextFieldName;

/// Assembles word-count-bounded samples from leaf contents.
#[derive(Clone, Debug)]
pub struct SampleAssembler {
    text_field: TextFieldName,
    sequence_length: usize,
}

impl SampleAssembler {
    /// Assembler producing samples of exactly `sequence_length` words, read
    /// from the `text_field` attribute of decoded leaves.
    pub fn new(text_field: impl Into<TextFieldName>, sequence_length: usize) -> Self {
        Self {
            text_field: text_field.into(),
            sequence_length,
        }
    }

    /// Assemble the sample anchored at `leaf_refs[start]`.
    ///
    /// Leaves are fetched one at a time, wrapping at the end of the list,
    /// and their texts joined by newlines until `sequence_length` words are
    /// reached; the joined text is then truncated to exactly that many
    /// words. A leaf that decodes as JSON but lacks the text field fails
    /// this sample only.
    pub async fn assemble<S: ContentStore>(
        &self,
        store: &S,
        leaf_refs: &[LeafRef],
        start: usize,
    ) -> Result<RawSample, StreamError> {
        if leaf_refs.is_empty() {
            return Err(StreamError::InvalidArgument(
                "cannot assemble a sample from an empty leaf list".into(),
            ));
        }

        let mut text = String::new();
        let mut words = 0usize;
        let mut idx = start % leaf_refs.len();
        let mut visited = 0usize;

        while words < self.sequence_length {
            let leaf = &leaf_refs[idx];
            let body = store
                .fetch_bytes(
                    leaf,
                    consts::LEAF_CHUNK_BUDGET,
                    store_consts::DEFAULT_CHUNK_SIZE,
                )
                .await?;
            let leaf_text = self.leaf_text(leaf, &body)?;

            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&leaf_text);
            words = text.split_whitespace().count();

            idx = (idx + 1) % leaf_refs.len();
            visited += 1;
            // One full wrap with no words at all means the list can never
            // satisfy the target; bail instead of spinning.
            if visited >= leaf_refs.len() && words == 0 {
                return Err(StreamError::MissingTextField {
                    hash: leaf_refs[start % leaf_refs.len()].hash.clone(),
                    field: self.text_field.clone(),
                });
            }
        }

        let truncated = text
            .split_whitespace()
            .take(self.sequence_length)
            .collect::<Vec<_>>()
            .join(" ");
        debug!(start, leaves = visited, "assembled sample");
        Ok(RawSample { text: truncated })
    }

    /// Extract sample text from one leaf body.
    ///
    /// JSON object bodies must carry the configured text field; anything
    /// that is not a JSON object is taken verbatim as UTF-8 text.
    fn leaf_text(&self, leaf: &LeafRef, body: &[u8]) -> Result<String, StreamError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(record)) => match record.get(self.text_field.as_str()) {
                Some(Value::String(text)) => Ok(text.clone()),
                Some(other) => Ok(other.to_string()),
                None => Err(StreamError::MissingTextField {
                    hash: leaf.hash.clone(),
                    field: self.text_field.clone(),
                }),
            },
            _ => Ok(String::from_utf8_lossy(body).into_owned()),
        }
    }
}

/// Cap `text` at its first `max_words` whitespace-separated words.
pub fn cap_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
