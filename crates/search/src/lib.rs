//! LexRAG Search
//!
//! Vector index construction, persistence and top-k retrieval.

pub mod index;
pub mod retrieval;

pub use index::{BuildOptions, IndexInfo, RetrievedChunk, VectorIndex};
pub use retrieval::{retrieve, Retriever};
