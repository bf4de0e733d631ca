//! Fixed-size separator splitting with character overlap.
//!
//! Deliberately simple: segments delimited by a separator are greedily packed
//! into chunks up to a size bound, and consecutive chunks share a short
//! character tail so retrieval does not lose context at chunk edges. No
//! semantic analysis happens here.

use serde::{Deserialize, Serialize};

use crate::types::{Chunk, RagError};

/// Configuration for [`split`].
///
/// `overlap` counts characters: each chunk after the first begins with the
/// last `overlap` characters of its predecessor. `overlap` must be strictly
/// smaller than `max_chunk_size`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Upper bound on chunk length in characters. Soft: a single segment
    /// longer than this is emitted whole rather than truncated.
    pub max_chunk_size: usize,
    /// Characters repeated from the end of the previous chunk.
    pub overlap: usize,
    /// Segment delimiter. An empty separator means the whole text is one
    /// segment.
    pub separator: String,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 500,
            overlap: 50,
            separator: ".".to_string(),
        }
    }
}

impl ChunkerConfig {
    /// Rejects configurations where the overlap cannot fit inside a chunk.
    ///
    /// Covers `max_chunk_size == 0` as well, since any overlap is then too
    /// large.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.overlap >= self.max_chunk_size {
            return Err(RagError::InvalidChunkConfig {
                max_chunk_size: self.max_chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }
}

/// Splits `text` into chunks for `source_id` according to `config`.
///
/// Segments are produced by splitting on the separator (trimmed, empties
/// dropped) and packed greedily: a segment joins the current chunk only while
/// the joined length stays under `max_chunk_size`. Empty input yields an
/// empty vector. Every segment of the input appears in exactly one chunk
/// (plus overlap repetition), so no content is silently lost.
pub fn split(config: &ChunkerConfig, source_id: &str, text: &str) -> Result<Vec<Chunk>, RagError> {
    config.validate()?;

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();

    let segments: Vec<&str> = if config.separator.is_empty() {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed]
        }
    } else {
        text.split(config.separator.as_str())
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect()
    };

    for segment in segments {
        if !current.is_empty() {
            let joined_len =
                current.chars().count() + config.separator.chars().count() + segment.chars().count();
            if joined_len >= config.max_chunk_size {
                let carry = tail_chars(&current, config.overlap);
                chunks.push(Chunk::new(source_id, chunks.len(), current));
                current = carry;
            }
        }

        if current.is_empty() {
            current = segment.to_string();
        } else {
            current.push_str(&config.separator);
            current.push_str(segment);
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(source_id, chunks.len(), current));
    }

    Ok(chunks)
}

/// Last `n` characters of `text`, respecting char boundaries.
fn tail_chars(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: usize, overlap: usize, separator: &str) -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_size: max,
            overlap,
            separator: separator.to_string(),
        }
    }

    #[test]
    fn each_segment_standalone_when_bound_is_tight() {
        let chunks = split(&config(3, 0, "."), "doc", "A.B.C.D.").unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C", "D"]);
        let ordinals: Vec<usize> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
    }

    #[test]
    fn packs_segments_up_to_the_bound() {
        let chunks = split(&config(20, 0, "."), "doc", "one.two.three.four.five").unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 20, "oversized: {:?}", chunk.text);
        }
    }

    #[test]
    fn oversized_segment_is_emitted_whole() {
        let long = "x".repeat(40);
        let text = format!("short.{long}.tail");
        let chunks = split(&config(10, 0, "."), "doc", &text).unwrap();
        assert!(chunks.iter().any(|c| c.text == long), "long segment must survive intact");
    }

    #[test]
    fn overlap_repeats_previous_tail() {
        let chunks = split(&config(8, 3, "."), "doc", "abcdef.ghijkl.mnopqr").unwrap();
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let tail = tail_chars(&pair[0].text, 3);
            assert!(
                pair[1].text.starts_with(&tail),
                "chunk {:?} should start with {:?}",
                pair[1].text,
                tail
            );
        }
    }

    #[test]
    fn overlap_must_be_smaller_than_max() {
        for (max, overlap) in [(10, 10), (10, 11), (1, 1), (0, 0)] {
            let err = split(&config(max, overlap, "."), "doc", "a.b").unwrap_err();
            assert!(matches!(err, RagError::InvalidChunkConfig { .. }));
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split(&config(10, 2, "."), "doc", "").unwrap().is_empty());
        assert!(split(&config(10, 2, "."), "doc", "...").unwrap().is_empty());
    }

    #[test]
    fn no_content_is_lost() {
        let text = "alpha.beta gamma.delta.epsilon zeta.eta.theta";
        let chunks = split(&config(12, 4, "."), "doc", text).unwrap();
        let combined: String = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(".");
        for segment in text.split('.').map(str::trim).filter(|s| !s.is_empty()) {
            assert!(combined.contains(segment), "segment {segment:?} missing from chunks");
        }
    }

    #[test]
    fn empty_separator_treats_text_as_one_segment() {
        let chunks = split(&config(4, 0, ""), "doc", "hello world").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
    }

    #[test]
    fn multibyte_text_is_boundary_safe() {
        let text = "héllo wörld.ünïcode tëxt.mörë dätä";
        let chunks = split(&config(14, 5, "."), "doc", text).unwrap();
        assert!(!chunks.is_empty());
        // tail_chars must never split a code point; constructing the Strings
        // above would have panicked if it did.
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
    }
}
