//! Chunk codec: splits oversized values into bounded rows.
//!
//! Backends have practical limits on row size, so encoded values are
//! split into chunks of at most `max_chunk_size` bytes. A logical key
//! `K` is persisted as one control row `K_chunks` holding the decimal
//! chunk count `N`, plus data rows `K_chunk_0 .. K_chunk_(N-1)`.
//!
//! Splitting is pure byte-budget slicing of the already-encoded value;
//! the codec has no knowledge of encryption.

use crate::error::{CoreError, CoreResult};

/// Suffix of the control row recording the chunk count.
const COUNT_SUFFIX: &str = "_chunks";
/// Infix of the data rows holding chunk payloads.
const DATA_INFIX: &str = "_chunk_";

/// Returns the physical key of the control row for `key`.
#[must_use]
pub fn count_key(key: &str) -> String {
    format!("{key}{COUNT_SUFFIX}")
}

/// Returns the physical key of chunk `index` for `key`.
#[must_use]
pub fn chunk_key(key: &str, index: u32) -> String {
    format!("{key}{DATA_INFIX}{index}")
}

/// Returns the physical-key prefix shared by every data row of `key`.
#[must_use]
pub fn chunk_prefix(key: &str) -> String {
    format!("{key}{DATA_INFIX}")
}

/// Splits and reassembles encoded values.
#[derive(Debug, Clone, Copy)]
pub struct ChunkCodec {
    /// Maximum encoded bytes per chunk.
    max_chunk_size: usize,
    /// Maximum chunks a single value may produce.
    max_chunks: u32,
}

impl ChunkCodec {
    /// Creates a codec with the given bounds.
    #[must_use]
    pub const fn new(max_chunk_size: usize, max_chunks: u32) -> Self {
        Self {
            max_chunk_size,
            max_chunks,
        }
    }

    /// Splits `value` into chunks of at most `max_chunk_size` bytes.
    ///
    /// Chunks are cut on character boundaries so every chunk is valid
    /// UTF-8. An empty value still produces one empty chunk, so a key
    /// stored with an empty value reads back as empty rather than
    /// "not found".
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Capacity`] when the value would produce
    /// more than `max_chunks` chunks - nothing is written in that
    /// case - and [`CoreError::Validation`] when `max_chunk_size`
    /// cannot fit a single character of the value.
    pub fn split(&self, value: &str) -> CoreResult<Vec<String>> {
        if value.is_empty() {
            return Ok(vec![String::new()]);
        }

        let mut chunks = Vec::with_capacity(value.len() / self.max_chunk_size + 1);
        let mut start = 0;

        while start < value.len() {
            let mut end = usize::min(start + self.max_chunk_size, value.len());
            while !value.is_char_boundary(end) {
                end -= 1;
            }
            if end == start {
                return Err(CoreError::validation(format!(
                    "max_chunk_size {} cannot fit a single character",
                    self.max_chunk_size
                )));
            }
            chunks.push(value[start..end].to_owned());
            start = end;
        }

        if chunks.len() > self.max_chunks as usize {
            return Err(CoreError::capacity(format!(
                "value splits into {} chunks, limit is {}",
                chunks.len(),
                self.max_chunks
            )));
        }

        Ok(chunks)
    }

    /// Reassembles chunks in index order into the original value.
    #[must_use]
    pub fn join(&self, chunks: &[String]) -> String {
        let total: usize = chunks.iter().map(String::len).sum();
        let mut value = String::with_capacity(total);
        for chunk in chunks {
            value.push_str(chunk);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn split_empty_produces_one_empty_chunk() {
        let codec = ChunkCodec::new(10, 100);
        let chunks = codec.split("").unwrap();
        assert_eq!(chunks, vec![String::new()]);
    }

    #[test]
    fn split_small_value_is_single_chunk() {
        let codec = ChunkCodec::new(10, 100);
        let chunks = codec.split("hello").unwrap();
        assert_eq!(chunks, vec!["hello".to_owned()]);
    }

    #[test]
    fn split_exact_multiple() {
        let codec = ChunkCodec::new(2, 100);
        let chunks = codec.split("abcd").unwrap();
        assert_eq!(chunks, vec!["ab", "cd"]);
    }

    #[test]
    fn split_three_and_a_half_budgets_gives_four_chunks() {
        let codec = ChunkCodec::new(10, 100);
        let value = "x".repeat(35);
        let chunks = codec.split(&value).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3].len(), 5);
    }

    #[test]
    fn split_respects_char_boundaries() {
        let codec = ChunkCodec::new(4, 100);
        // Two-byte characters do not divide the 4-byte budget evenly.
        let value = "ééé"; // 2 bytes each, 6 bytes total
        let chunks = codec.split(value).unwrap();
        for chunk in &chunks {
            assert!(chunk.len() <= 4);
        }
        assert_eq!(codec.join(&chunks), value);
    }

    #[test]
    fn split_rejects_over_chunk_budget() {
        let codec = ChunkCodec::new(2, 3);
        let result = codec.split("aaaaaaaa"); // 4 chunks
        assert!(matches!(result, Err(CoreError::Capacity { .. })));
    }

    #[test]
    fn split_rejects_budget_below_char_width() {
        let codec = ChunkCodec::new(1, 100);
        let result = codec.split("é"); // 2 bytes
        assert!(matches!(result, Err(CoreError::Validation { .. })));
    }

    #[test]
    fn join_concatenates_in_order() {
        let codec = ChunkCodec::new(5, 100);
        let chunks = vec!["ab".to_owned(), "cd".to_owned(), "e".to_owned()];
        assert_eq!(codec.join(&chunks), "abcde");
    }

    #[test]
    fn key_layout() {
        assert_eq!(count_key("user"), "user_chunks");
        assert_eq!(chunk_key("user", 0), "user_chunk_0");
        assert_eq!(chunk_key("user", 12), "user_chunk_12");
        assert_eq!(chunk_prefix("user"), "user_chunk_");
    }

    proptest! {
        #[test]
        fn split_join_roundtrip(value in ".{0,400}") {
            let codec = ChunkCodec::new(16, 1_000);
            let chunks = codec.split(&value).unwrap();
            prop_assert_eq!(codec.join(&chunks), value);
        }

        #[test]
        fn chunks_stay_within_budget(value in ".{1,400}") {
            let codec = ChunkCodec::new(16, 1_000);
            let chunks = codec.split(&value).unwrap();
            for chunk in &chunks {
                prop_assert!(chunk.len() <= 16);
                prop_assert!(!chunk.is_empty());
            }
        }
    }
}
