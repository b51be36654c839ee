//! Exact cosine-similarity vector index
//!
//! Entries are stored row-major in one contiguous buffer, L2-normalized on
//! insertion, so similarity is a plain inner product. Entry ids are row
//! indices in insertion order.

mod persist;

pub use persist::FORMAT_VERSION;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use lexrag_common::errors::{AppError, Result};
use lexrag_common::metrics::record_index_size;
use lexrag_common::{Chunk, Embedder, Metadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// A ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Row index of the entry
    pub id: usize,

    /// Chunk content
    pub text: String,

    /// Chunk metadata
    pub metadata: Metadata,

    /// Cosine similarity to the query, in [-1, 1]
    pub score: f32,
}

/// Batching knobs for [`VectorIndex::build`]
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Texts per embedding request
    pub batch_size: usize,
    /// Embedding requests in flight
    pub concurrency: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            concurrency: 4,
        }
    }
}

/// Summary used by readiness probes and the ingest report
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub entries: usize,
    pub dimension: usize,
    pub model: String,
    pub built_at: DateTime<Utc>,
}

/// In-memory index over chunk embeddings
#[derive(Debug, Clone)]
pub struct VectorIndex {
    model: String,
    dimension: usize,
    built_at: DateTime<Utc>,
    vectors: Vec<f32>,
    texts: Vec<String>,
    metadata: Vec<Metadata>,
}

impl VectorIndex {
    /// Embed every chunk and assemble the index.
    ///
    /// Batches are embedded with bounded concurrency; results keep chunk
    /// order. Any failed or malformed batch fails the whole build.
    #[instrument(skip_all, fields(chunks = chunks.len(), model = %embedder.model_name()))]
    pub async fn build(
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        options: &BuildOptions,
    ) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(AppError::invalid_argument("batch_size must be positive"));
        }

        let dimension = embedder.dimension();
        let batches: Vec<Vec<String>> = chunks
            .chunks(options.batch_size)
            .map(|batch| batch.iter().map(|c| c.text.clone()).collect())
            .collect();

        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches.iter())
            .map(|batch| embedder.embed_batch(batch))
            .buffered(options.concurrency.max(1))
            .try_collect()
            .await
            .map_err(|e| AppError::build("Embedding request failed", e))?;

        let mut vectors = Vec::with_capacity(chunks.len() * dimension);
        for (batch_index, (batch, output)) in batches.iter().zip(embedded).enumerate() {
            if output.len() != batch.len() {
                return Err(AppError::build(
                    format!("Batch {} returned the wrong number of vectors", batch_index),
                    AppError::Embedding {
                        message: format!("expected {}, got {}", batch.len(), output.len()),
                    },
                ));
            }
            for mut vector in output {
                check_vector(&vector, dimension)
                    .map_err(|e| AppError::build(format!("Batch {} is malformed", batch_index), e))?;
                normalize(&mut vector);
                vectors.extend_from_slice(&vector);
            }
            debug!(batch = batch_index, size = batch.len(), "Embedded batch");
        }

        let index = Self {
            model: embedder.model_name().to_string(),
            dimension,
            built_at: Utc::now(),
            vectors,
            texts: chunks.iter().map(|c| c.text.clone()).collect(),
            metadata: chunks.iter().map(|c| c.metadata.clone()).collect(),
        };

        record_index_size(index.len());
        info!(entries = index.len(), dimension, "Vector index built");
        Ok(index)
    }

    /// Rank entries by cosine similarity to `query`, best first.
    ///
    /// Equal scores keep insertion order. Returns every entry when the
    /// index holds fewer than `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Err(AppError::invalid_argument("k must be positive"));
        }
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(AppError::invalid_argument("query vector has non-finite components"));
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .rows()
            .enumerate()
            .map(|(id, row)| (id, dot(row, &query)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(id, score)| RetrievedChunk {
                id,
                text: self.texts[id].clone(),
                metadata: self.metadata[id].clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Name of the embedding model the vectors came from
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn info(&self) -> IndexInfo {
        IndexInfo {
            entries: self.len(),
            dimension: self.dimension,
            model: self.model.clone(),
            built_at: self.built_at,
        }
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0; a zero-dimension index has no rows
        self.vectors.chunks_exact(self.dimension.max(1))
    }
}

fn check_vector(vector: &[f32], dimension: usize) -> Result<()> {
    if vector.len() != dimension {
        return Err(AppError::DimensionMismatch {
            expected: dimension,
            found: vector.len(),
        });
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(AppError::Embedding {
            message: "vector has non-finite components".to_string(),
        });
    }
    Ok(())
}

/// Scale to unit length in place; zero vectors are left untouched
fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>()
}
