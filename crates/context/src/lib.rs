//! LexRAG Context
//!
//! Prompt assembly, answer generation and the query engine that ties
//! retrieval and generation together.

pub mod answer;
pub mod engine;
pub mod prompt;

pub use answer::{answer, Answer};
pub use engine::{QueryEngine, QueryOverrides, QueryResponse};
pub use prompt::{PromptTemplate, DEFAULT_TEMPLATE};
