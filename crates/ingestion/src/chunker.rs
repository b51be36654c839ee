//! Text chunking module
//!
//! Splits document text into fixed-size overlapping windows for embedding.
//! Sizes and offsets are measured in characters (Unicode scalar values).

use lexrag_common::errors::{AppError, Result};
use lexrag_common::{Chunk, SourceDocument};
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window width in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive windows
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            chunk_overlap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(AppError::invalid_argument("chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::invalid_argument(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between consecutive window starts
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Split every document into overlapping windows, in document order.
pub fn chunk_documents(documents: &[SourceDocument], config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let mut chunks = Vec::new();
    for document in documents {
        chunks.extend(
            split_windows(&document.text, config)
                .into_iter()
                .map(|(offset, text)| Chunk {
                    text,
                    metadata: document.metadata.clone(),
                    offset,
                }),
        );
    }

    debug!(
        documents = documents.len(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        "Documents chunked"
    );

    Ok(chunks)
}

/// Slide a `chunk_size` window over `text` with stride `chunk_size - chunk_overlap`.
///
/// A new window opens only while the previous one ended before the end of the
/// text, so no window is entirely contained in its predecessor. Returns
/// `(offset, text)` pairs; `config` must already be validated.
fn split_windows(text: &str, config: &ChunkingConfig) -> Vec<(usize, String)> {
    // Byte position of every char boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_len = boundaries.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0;

    while start < total_len {
        let end = (start + config.chunk_size).min(total_len);
        windows.push((start, text[boundaries[start]..boundaries[end]].to_string()));

        if end == total_len {
            break;
        }
        start += config.stride();
    }

    windows
}

/// Rebuild a document's text from its chunks by dropping each overlap.
pub fn reconstruct(chunks: &[Chunk], chunk_overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(&chunk.text);
        } else {
            text.extend(chunk.text.chars().skip(chunk_overlap));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrag_common::Metadata;
    use proptest::prelude::*;
    use serde_json::json;

    fn document(text: &str) -> SourceDocument {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("data/contracts.pdf"));
        metadata.insert("page".to_string(), json!(3));
        SourceDocument::new(text, metadata)
    }

    fn expected_count(len: usize, size: usize, overlap: usize) -> usize {
        if len == 0 {
            0
        } else if len <= size {
            1
        } else {
            (len - overlap).div_ceil(size - overlap)
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            ChunkingConfig::new(0, 0),
            Err(AppError::InvalidArgument { .. })
        ));
        assert!(matches!(
            ChunkingConfig::new(100, 100),
            Err(AppError::InvalidArgument { .. })
        ));
        assert!(ChunkingConfig::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_documents(&[document("")], &ChunkingConfig::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_documents(&[document("Consideration.")], &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Consideration.");
        assert_eq!(chunks[0].offset, 0);
    }

    #[test]
    fn test_exact_window_is_single_chunk() {
        let text = "a".repeat(500);
        let chunks = chunk_documents(&[document(&text)], &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_windows_and_offsets() {
        let config = ChunkingConfig::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_documents(&[document(text)], &config).unwrap();

        let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0, 7, 14, 21]);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "hijklmnopq");
        assert_eq!(chunks[3].text, "vwxyz");
        assert_eq!(chunks.len(), expected_count(26, 10, 3));
    }

    #[test]
    fn test_metadata_is_inherited() {
        let config = ChunkingConfig::new(4, 1).unwrap();
        let doc = document("0123456789");
        let chunks = chunk_documents(std::slice::from_ref(&doc), &config).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(chunk.metadata, doc.metadata);
        }
    }

    #[test]
    fn test_multibyte_text_counts_characters() {
        let config = ChunkingConfig::new(3, 1).unwrap();
        let text = "§1 Vertragsänderung";
        let chunks = chunk_documents(&[document(text)], &config).unwrap();
        assert_eq!(chunks[0].text, "§1 ");
        assert_eq!(reconstruct(&chunks, 1), text);
    }

    #[test]
    fn test_documents_are_chunked_in_order() {
        let config = ChunkingConfig::new(5, 0).unwrap();
        let chunks =
            chunk_documents(&[document("first doc"), document(""), document("second")], &config)
                .unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", " doc", "secon", "d"]);
    }

    proptest! {
        #[test]
        fn prop_chunk_count_and_reconstruction(
            text in "\\PC{0,400}",
            size in 1usize..64,
            overlap_seed in 0usize..64,
        ) {
            let overlap = overlap_seed % size;
            let config = ChunkingConfig::new(size, overlap).unwrap();
            let chunks = chunk_documents(&[document(&text)], &config).unwrap();
            let len = text.chars().count();

            prop_assert_eq!(chunks.len(), expected_count(len, size, overlap));
            prop_assert_eq!(reconstruct(&chunks, overlap), text.clone());

            for pair in chunks.windows(2) {
                let tail: String = pair[0].text.chars().skip(size - overlap).collect();
                let head: String = pair[1].text.chars().take(overlap).collect();
                prop_assert_eq!(pair[0].text.chars().count(), size);
                prop_assert_eq!(tail, head);
            }
            for chunk in &chunks {
                prop_assert!(chunk.text.chars().count() <= size);
            }
        }

        #[test]
        fn prop_chunking_is_deterministic(text in "[a-z ]{0,200}", size in 2usize..40) {
            let config = ChunkingConfig::new(size, size / 2).unwrap();
            let first = chunk_documents(&[document(&text)], &config).unwrap();
            let second = chunk_documents(&[document(&text)], &config).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
