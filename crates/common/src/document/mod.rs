//! Corpus data model shared by ingestion and retrieval

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form metadata attached to documents, chunks and index entries
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key naming the originating file or record set
pub const SOURCE_KEY: &str = "source";

/// Metadata key carrying the 0-based page index of a paginated source
pub const PAGE_KEY: &str = "page";

/// Metadata key carrying a structured record's identifier
pub const ID_KEY: &str = "id";

/// Source tag shared by every structured query/response record
pub const RECORD_SOURCE: &str = "JSONL";

/// A loaded unit of corpus text (one PDF page or one record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub text: String,
    pub metadata: Metadata,
}

impl SourceDocument {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// The `source` identifier, when present as a string
    pub fn source(&self) -> Option<&str> {
        source_of(&self.metadata)
    }
}

/// A window of a document's text, ready for embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk content
    pub text: String,
    /// Metadata inherited unchanged from the parent document
    pub metadata: Metadata,
    /// Start position in the parent text, in characters
    pub offset: usize,
}

/// Read the `source` identifier out of a metadata map
pub fn source_of(metadata: &Metadata) -> Option<&str> {
    metadata.get(SOURCE_KEY).and_then(Value::as_str)
}
