//! Tokenizer interface and the tokenized batch container.
//!
//! The pipeline treats tokenization as a black box mapping texts to integer
//! id sequences with optional padding. `HashingTokenizer` is a dependency-
//! free default good enough for smoke tests and throughput work; real
//! vocabularies plug in through the `Tokenizer` trait (see the
//! `hf-tokenizer` feature for a HuggingFace adapter).

use crate::errors::StreamError;
use crate::hash::stable_hash_str;
use crate::types::TokenId;

/// A finished training batch: token ids and attention mask, one row per
/// sample. Immutable once enqueued; ownership moves to the consumer on
/// dequeue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenizedBatch {
    /// Token ids, `batch_size x sequence_length` when padded.
    pub input_ids: Vec<Vec<TokenId>>,
    /// 1 for real tokens, 0 for padding; same shape as `input_ids`.
    pub attention_mask: Vec<Vec<TokenId>>,
}

impl TokenizedBatch {
    /// `(rows, columns)` shape; columns is the widest row.
    pub fn shape(&self) -> (usize, usize) {
        let columns = self
            .input_ids
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or_default();
        (self.input_ids.len(), columns)
    }

    /// Slice every row down to at most `columns` token columns.
    pub fn truncate_columns(&mut self, columns: usize) {
        for row in &mut self.input_ids {
            row.truncate(columns);
        }
        for row in &mut self.attention_mask {
            row.truncate(columns);
        }
    }
}

/// Black-box tokenizer interface consumed by the producer.
pub trait Tokenizer: Send + Sync {
    /// Tokenize `texts` into one batch. With `padding`, rows are padded to
    /// the longest row so the batch is rectangular.
    fn encode_batch(&self, texts: &[String], padding: bool)
        -> Result<TokenizedBatch, StreamError>;
}

/// Whitespace tokenizer with stable-hashed word ids.
///
/// Ids are `stable_hash(seed, word) % vocab_size`, offset past the pad id,
/// so the same word always maps to the same id within a run.
#[derive(Clone, Debug)]
pub struct HashingTokenizer {
    vocab_size: u64,
    seed: u64,
}

impl HashingTokenizer {
    /// Pad token id emitted for padded positions.
    pub const PAD_ID: TokenId = 0;

    /// Tokenizer hashing into `vocab_size` ids with the given `seed`.
    pub fn new(vocab_size: u64, seed: u64) -> Self {
        Self {
            vocab_size: vocab_size.max(2),
            seed,
        }
    }

    fn word_id(&self, word: &str) -> TokenId {
        // Reserve id 0 for padding.
        (stable_hash_str(self.seed, word) % (self.vocab_size - 1) + 1) as TokenId
    }
}

impl Default for HashingTokenizer {
    fn default() -> Self {
        Self::new(50_000, 0)
    }
}

impl Tokenizer for HashingTokenizer {
    fn encode_batch(
        &self,
        texts: &[String],
        padding: bool,
    ) -> Result<TokenizedBatch, StreamError> {
        let mut input_ids: Vec<Vec<TokenId>> = texts
            .iter()
            .map(|text| text.split_whitespace().map(|w| self.word_id(w)).collect())
            .collect();
        let mut attention_mask: Vec<Vec<TokenId>> = input_ids
            .iter()
            .map(|row| vec![1; row.len()])
            .collect();

        if padding {
            let width = input_ids.iter().map(Vec::len).max().unwrap_or_default();
            for (ids, mask) in input_ids.iter_mut().zip(attention_mask.iter_mut()) {
                ids.resize(width, Self::PAD_ID);
                mask.resize(width, 0);
            }
        }

        Ok(TokenizedBatch {
            input_ids,
            attention_mask,
        })
    }
}

/// Adapter for the HuggingFace `tokenizers` crate.
#[cfg(feature = "hf-tokenizer")]
pub mod hf {
    use super::{TokenizedBatch, Tokenizer};
    use crate::errors::StreamError;
    use crate::types::TokenId;

    /// Wraps a `tokenizers::Tokenizer` behind the pipeline's interface.
    pub struct HfTokenizer {
        inner: tokenizers::Tokenizer,
        pad_id: TokenId,
    }

    impl HfTokenizer {
        /// Wrap `inner`, padding with `pad_id` when requested.
        pub fn new(inner: tokenizers::Tokenizer, pad_id: TokenId) -> Self {
            Self { inner, pad_id }
        }
    }

    impl Tokenizer for HfTokenizer {
        fn encode_batch(
            &self,
            texts: &[String],
            padding: bool,
        ) -> Result<TokenizedBatch, StreamError> {
            let encodings = self
                .inner
                .encode_batch(texts.to_vec(), false)
                .map_err(|err| StreamError::InvalidArgument(err.to_string()))?;
            let mut input_ids: Vec<Vec<TokenId>> = encodings
                .iter()
                .map(|enc| enc.get_ids().to_vec())
                .collect();
            let mut attention_mask: Vec<Vec<TokenId>> = encodings
                .iter()
                .map(|enc| enc.get_attention_mask().to_vec())
                .collect();
            if padding {
                let width = input_ids.iter().map(Vec::len).max().unwrap_or_default();
                for (ids, mask) in input_ids.iter_mut().zip(attention_mask.iter_mut()) {
                    ids.resize(width, self.pad_id);
                    mask.resize(width, 0);
                }
            }
            Ok(TokenizedBatch {
                input_ids,
                attention_mask,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_batches_are_rectangular() {
        let tokenizer = HashingTokenizer::default();
        let texts = vec!["one two three".to_string(), "four".to_string()];
        let batch = tokenizer.encode_batch(&texts, true).unwrap();
        assert_eq!(batch.shape(), (2, 3));
        assert_eq!(batch.input_ids[1][1], HashingTokenizer::PAD_ID);
        assert_eq!(batch.attention_mask[0], vec![1, 1, 1]);
        assert_eq!(batch.attention_mask[1], vec![1, 0, 0]);
    }

    #[test]
    fn unpadded_batches_keep_ragged_rows() {
        let tokenizer = HashingTokenizer::default();
        let texts = vec!["one two three".to_string(), "four".to_string()];
        let batch = tokenizer.encode_batch(&texts, false).unwrap();
        assert_eq!(batch.input_ids[0].len(), 3);
        assert_eq!(batch.input_ids[1].len(), 1);
    }

    #[test]
    fn same_word_gets_the_same_id() {
        let tokenizer = HashingTokenizer::default();
        let texts = vec!["echo echo".to_string()];
        let batch = tokenizer.encode_batch(&texts, false).unwrap();
        assert_eq!(batch.input_ids[0][0], batch.input_ids[0][1]);
        assert_ne!(batch.input_ids[0][0], HashingTokenizer::PAD_ID);
    }

    #[test]
    fn truncate_columns_slices_every_row() {
        let tokenizer = HashingTokenizer::default();
        let texts = vec!["a b c d e".to_string(), "f g".to_string()];
        let mut batch = tokenizer.encode_batch(&texts, true).unwrap();
        batch.truncate_columns(3);
        assert_eq!(batch.shape(), (2, 3));
    }
}
