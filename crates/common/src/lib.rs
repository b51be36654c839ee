//! LexRAG Common Library
//!
//! Shared code for the LexRAG ingestion job and query services including:
//! - Corpus data model (documents, chunks, metadata)
//! - Embedding client abstraction
//! - Generative model client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and tracing setup

pub mod config;
pub mod document;
pub mod embeddings;
pub mod errors;
pub mod generation;
pub mod metrics;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use document::{Chunk, Metadata, SourceDocument};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use generation::{GenerationOptions, Generator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
