//! Query-time retrieval
//!
//! Embeds a question with the same model used at build time and returns
//! the top-k passages from the shared index.

use crate::index::{RetrievedChunk, VectorIndex};
use lexrag_common::errors::{AppError, Result};
use lexrag_common::metrics::record_retrieval;
use lexrag_common::Embedder;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Read-only retriever over a shared index
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    /// Retrieve the `k` passages most similar to `query`
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        retrieve(&self.index, self.embedder.as_ref(), query, k).await
    }
}

/// Embed `query` and search `index` for the `k` best passages.
#[instrument(skip(index, embedder, query), fields(query_len = query.len()))]
pub async fn retrieve(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    if k == 0 {
        return Err(AppError::invalid_argument("k must be positive"));
    }

    let start = Instant::now();
    let query_vector = embedder.embed(query).await?;
    let hits = index.search(&query_vector, k)?;

    record_retrieval(hits.len());
    if hits.is_empty() {
        info!(entries = index.len(), "No passages retrieved");
    } else {
        debug!(
            hits = hits.len(),
            top_score = hits[0].score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Passages retrieved"
        );
    }

    Ok(hits)
}
