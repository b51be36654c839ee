//! LexRAG ingest job
//!
//! One-shot batch run:
//! 1. Loads PDF pages and query/response records
//! 2. Chunks them into overlapping windows
//! 3. Embeds the chunks into a vector index
//! 4. Writes the index to disk for the query service

use anyhow::Context;
use clap::Parser;
use lexrag_common::config::AppConfig;
use lexrag_common::embeddings::create_embedder;
use lexrag_common::telemetry::init_tracing;
use lexrag_common::VERSION;
use lexrag_ingestion::processor::IngestionPipeline;
use std::path::PathBuf;
use tracing::{error, info};

/// Ingest command line arguments.
#[derive(Parser, Debug)]
#[command(name = "ingest", version)]
#[command(about = "Build the LexRAG vector index from the legal corpus")]
struct Args {
    /// Configuration file (defaults to config/default, config/$APP_ENV, config/local)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Directory of PDF files; pass an empty string to skip PDFs
    #[arg(long, value_name = "DIR")]
    pdf_dir: Option<PathBuf>,

    /// Line-delimited JSON query/response records; pass an empty string to skip
    #[arg(long, value_name = "FILE")]
    records: Option<PathBuf>,

    /// Where to write the index
    #[arg(long, value_name = "PATH")]
    index_path: Option<PathBuf>,

    /// Chunk width in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Embedding batches in flight at once
    #[arg(long, value_name = "N")]
    embed_concurrency: Option<usize>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(dir) = self.pdf_dir {
            config.ingestion.pdf_dir = Some(dir);
        }
        if let Some(records) = self.records {
            config.ingestion.records_path = Some(records);
        }
        if let Some(path) = self.index_path {
            config.index.path = path;
        }
        if let Some(size) = self.chunk_size {
            config.ingestion.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.ingestion.chunk_overlap = overlap;
        }
        if let Some(concurrency) = self.embed_concurrency {
            config.ingestion.embed_concurrency = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let mut args = Args::parse();

    let mut config = match args.config.take() {
        Some(path) => AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::load().context("Failed to load configuration")?,
    };
    args.apply(&mut config);

    init_tracing(&config.observability);
    info!("Starting LexRAG ingest v{}", VERSION);

    config.validate()?;

    let embedder = create_embedder(&config.embedding)?;
    let pipeline = IngestionPipeline::new(config, embedder);

    match pipeline.run().await {
        Ok(report) => {
            info!(
                documents = report.documents,
                chunks = report.chunks,
                entries = report.entries,
                index_path = %report.index_path.display(),
                "Index ready"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, code = %e.code().as_code(), "Ingestion failed");
            Err(e.into())
        }
    }
}
