//! Deterministic list partitioning used to form fetch batches.
//!
//! The remainder of an uneven split is set aside first (the leading
//! `len % chunk_size` items), the rest is cut into equal chunks, and the
//! remainder is then either appended as one short trailing chunk or
//! distributed round-robin across the main chunks.

use crate::errors::StreamError;

/// Policy for the leftover items of an uneven partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemainderPolicy {
    /// Emit the remainder as one extra, possibly short, final chunk.
    Append,
    /// Append remainder item `i` to the tail of main chunk `i % chunks`.
    Distribute,
}

/// Split `items` into ordered chunks.
///
/// Exactly one of `chunk_size` / `num_chunks` must be given; with
/// `num_chunks` the chunk size is `len / num_chunks`. When the chunk size
/// covers the whole input a single chunk is returned. Pure and
/// deterministic; item order is preserved within every chunk, and remainder
/// items land at chunk tails, never interleaved.
pub fn partition<T: Clone>(
    items: &[T],
    chunk_size: Option<usize>,
    num_chunks: Option<usize>,
    policy: RemainderPolicy,
) -> Result<Vec<Vec<T>>, StreamError> {
    let chunk_size = resolve_chunk_size(items.len(), chunk_size, num_chunks)?;

    if chunk_size >= items.len() {
        return Ok(vec![items.to_vec()]);
    }

    let remainder_len = items.len() % chunk_size;
    let (remainder, body) = items.split_at(remainder_len);
    let mut chunks: Vec<Vec<T>> = body.chunks(chunk_size).map(<[T]>::to_vec).collect();

    match policy {
        RemainderPolicy::Append => {
            if !remainder.is_empty() {
                chunks.push(remainder.to_vec());
            }
        }
        RemainderPolicy::Distribute => {
            let main_chunks = chunks.len();
            for (i, item) in remainder.iter().enumerate() {
                chunks[i % main_chunks].push(item.clone());
            }
        }
    }

    Ok(chunks)
}

fn resolve_chunk_size(
    len: usize,
    chunk_size: Option<usize>,
    num_chunks: Option<usize>,
) -> Result<usize, StreamError> {
    let size = match (chunk_size, num_chunks) {
        (Some(size), None) => size,
        (None, Some(count)) => {
            if count == 0 {
                return Err(StreamError::InvalidArgument(
                    "num_chunks must be positive".into(),
                ));
            }
            len / count
        }
        (Some(_), Some(_)) => {
            return Err(StreamError::InvalidArgument(
                "chunk_size and num_chunks are mutually exclusive".into(),
            ));
        }
        (None, None) => {
            return Err(StreamError::InvalidArgument(
                "one of chunk_size or num_chunks is required".into(),
            ));
        }
    };
    if size == 0 {
        return Err(StreamError::InvalidArgument(
            "resolved chunk_size must be positive".into(),
        ));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens<T>(chunks: &[Vec<T>]) -> Vec<usize> {
        chunks.iter().map(Vec::len).collect()
    }

    #[test]
    fn append_keeps_every_item_and_yields_short_tail() {
        let items: Vec<u32> = (1..=10).collect();
        let chunks = partition(&items, Some(3), None, RemainderPolicy::Append).unwrap();
        assert_eq!(chunks.len(), 4);
        let mut sizes = lens(&chunks);
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 3, 3, 3]);
        let total: usize = chunks.iter().map(Vec::len).sum();
        assert_eq!(total, items.len());

        let mut recovered: Vec<u32> = chunks.into_iter().flatten().collect();
        recovered.sort_unstable();
        assert_eq!(recovered, items);
    }

    #[test]
    fn distribute_appends_remainder_round_robin_at_tails() {
        let items: Vec<u32> = (1..=10).collect();
        let chunks = partition(&items, Some(3), None, RemainderPolicy::Distribute).unwrap();
        assert_eq!(lens(&chunks), vec![4, 3, 3]);
        // Remainder item 1 is appended to the tail of chunk 0.
        assert_eq!(chunks[0], vec![2, 3, 4, 1]);
        assert_eq!(chunks[1], vec![5, 6, 7]);
        assert_eq!(chunks[2], vec![8, 9, 10]);
    }

    #[test]
    fn distribute_spreads_longer_remainders() {
        let items: Vec<u32> = (0..11).collect();
        // chunk_size 3 over 11 items: remainder [0, 1], chunks of [2..11].
        let chunks = partition(&items, Some(3), None, RemainderPolicy::Distribute).unwrap();
        assert_eq!(lens(&chunks), vec![4, 4, 3]);
        assert_eq!(chunks[0].last(), Some(&0));
        assert_eq!(chunks[1].last(), Some(&1));
    }

    #[test]
    fn oversized_chunk_returns_single_chunk() {
        let items = vec![1, 2, 3];
        let chunks = partition(&items, Some(10), None, RemainderPolicy::Append).unwrap();
        assert_eq!(chunks, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn exact_division_has_no_remainder_chunk() {
        let items: Vec<u32> = (1..=9).collect();
        let chunks = partition(&items, Some(3), None, RemainderPolicy::Append).unwrap();
        assert_eq!(lens(&chunks), vec![3, 3, 3]);
        let flat: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(flat, items);
    }

    #[test]
    fn num_chunks_derives_chunk_size() {
        let items: Vec<u32> = (1..=10).collect();
        let chunks = partition(&items, None, Some(2), RemainderPolicy::Append).unwrap();
        // chunk_size = 10 / 2 = 5, no remainder.
        assert_eq!(lens(&chunks), vec![5, 5]);
    }

    #[test]
    fn conflicting_or_missing_hints_are_rejected() {
        let items = vec![1, 2, 3];
        assert!(matches!(
            partition(&items, Some(2), Some(2), RemainderPolicy::Append),
            Err(StreamError::InvalidArgument(_))
        ));
        assert!(matches!(
            partition::<u32>(&items, None, None, RemainderPolicy::Append),
            Err(StreamError::InvalidArgument(_))
        ));
        assert!(matches!(
            partition(&items, Some(0), None, RemainderPolicy::Append),
            Err(StreamError::InvalidArgument(_))
        ));
        // num_chunks larger than the list resolves to chunk_size 0.
        assert!(matches!(
            partition(&items, None, Some(10), RemainderPolicy::Append),
            Err(StreamError::InvalidArgument(_))
        ));
    }
}
