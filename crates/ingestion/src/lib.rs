//! LexRAG Ingestion
//!
//! Corpus loading (PDF pages and query/response records), fixed-window
//! chunking and the pipeline that turns the corpus into a persisted index.

pub mod chunker;
pub mod loader;
pub mod pdf;
pub mod processor;
pub mod records;

pub use chunker::{chunk_documents, ChunkingConfig};
pub use loader::{load_corpus, CorpusSources};
pub use processor::{IngestionPipeline, IngestionReport};
