//! Ingestion processor
//!
//! Core logic for the offline ingest job: load the corpus, chunk it, embed
//! the chunks into a vector index and persist the index.

use crate::chunker::{chunk_documents, ChunkingConfig};
use crate::loader::{load_corpus, CorpusSources};
use lexrag_common::config::AppConfig;
use lexrag_common::errors::Result;
use lexrag_common::metrics::record_ingestion;
use lexrag_common::Embedder;
use lexrag_search::{BuildOptions, VectorIndex};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Outcome of a successful ingest run
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    /// Pages and records loaded
    pub documents: usize,

    /// Chunks produced
    pub chunks: usize,

    /// Entries in the saved index
    pub entries: usize,

    /// Where the index was written
    pub index_path: PathBuf,

    /// Wall-clock duration of the run
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

/// Ingestion pipeline: load → chunk → build → save
pub struct IngestionPipeline {
    config: AppConfig,
    embedder: Arc<dyn Embedder>,
}

impl IngestionPipeline {
    pub fn new(config: AppConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self { config, embedder }
    }

    /// Run the whole pipeline.
    ///
    /// The index file is only replaced once every earlier stage succeeded.
    #[instrument(skip(self), fields(index_path = %self.config.index.path.display()))]
    pub async fn run(&self) -> Result<IngestionReport> {
        let start = Instant::now();
        let ingestion = &self.config.ingestion;

        let chunking = ChunkingConfig::new(ingestion.chunk_size, ingestion.chunk_overlap)?;

        info!("Loading corpus...");
        let documents = load_corpus(&CorpusSources::from_config(ingestion))?;

        let chunks = chunk_documents(&documents, &chunking)?;
        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "Corpus chunked"
        );

        info!(model = %self.embedder.model_name(), "Embedding chunks...");
        let options = BuildOptions {
            batch_size: self.config.embedding.batch_size,
            concurrency: ingestion.embed_concurrency,
        };
        let index = VectorIndex::build(&chunks, self.embedder.as_ref(), &options).await?;

        let index_path = self.config.index.path.clone();
        index.save(&index_path)?;

        let elapsed = start.elapsed();
        record_ingestion(elapsed.as_secs_f64(), documents.len(), chunks.len());

        let report = IngestionReport {
            documents: documents.len(),
            chunks: chunks.len(),
            entries: index.len(),
            index_path,
            elapsed,
        };

        info!(
            documents = report.documents,
            chunks = report.chunks,
            entries = report.entries,
            elapsed_ms = elapsed.as_millis() as u64,
            "Ingestion complete"
        );

        Ok(report)
    }
}
