//! Corpus loading
//!
//! Combines the PDF directory loader and the record loader into one
//! ordered document list: pages first, then records.

use crate::pdf::load_pdf_directory;
use crate::records::load_records;
use lexrag_common::config::IngestionConfig;
use lexrag_common::errors::Result;
use lexrag_common::SourceDocument;
use std::path::Path;
use tracing::{info, warn};

/// Where the corpus lives. A `None` (or empty) path disables that loader.
#[derive(Debug, Clone, Copy)]
pub struct CorpusSources<'a> {
    pub pdf_dir: Option<&'a Path>,
    pub pdf_extension: &'a str,
    pub records_path: Option<&'a Path>,
}

impl<'a> CorpusSources<'a> {
    pub fn from_config(config: &'a IngestionConfig) -> Self {
        Self {
            pdf_dir: config.pdf_dir.as_deref(),
            pdf_extension: &config.pdf_extension,
            records_path: config.records_path.as_deref(),
        }
    }
}

fn enabled(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}

/// Load every configured source.
pub fn load_corpus(sources: &CorpusSources<'_>) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();

    if let Some(dir) = enabled(sources.pdf_dir) {
        documents.extend(load_pdf_directory(dir, sources.pdf_extension)?);
    }

    if let Some(path) = enabled(sources.records_path) {
        documents.extend(load_records(path)?);
    }

    if documents.is_empty() {
        warn!("Corpus is empty, the index will have no entries");
    } else {
        info!(documents = documents.len(), "Corpus loaded");
    }

    Ok(documents)
}
