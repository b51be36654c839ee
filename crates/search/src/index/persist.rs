//! On-disk index format
//!
//! The index is stored as a single JSON document. Vector data is kept as
//! hex-encoded little-endian `f32` bytes so it reloads bit-for-bit, and a
//! SHA-256 of those bytes guards against truncation or tampering.

use super::VectorIndex;
use chrono::{DateTime, Utc};
use lexrag_common::errors::{AppError, Result};
use lexrag_common::metrics::record_index_size;
use lexrag_common::{Embedder, Metadata};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    format_version: u32,
    model: String,
    dimension: usize,
    built_at: DateTime<Utc>,
    count: usize,
    checksum: String,
    vectors: String,
    texts: Vec<String>,
    metadata: Vec<Metadata>,
}

fn vector_bytes(vectors: &[f32]) -> Vec<u8> {
    vectors.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl VectorIndex {
    /// Persist the index to `path`, replacing any previous file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = vector_bytes(&self.vectors);
        let file = IndexFile {
            format_version: FORMAT_VERSION,
            model: self.model.clone(),
            dimension: self.dimension,
            built_at: self.built_at,
            count: self.len(),
            checksum: checksum(&bytes),
            vectors: hex::encode(&bytes),
            texts: self.texts.clone(),
            metadata: self.metadata.clone(),
        };

        let tmp = temp_path(path);
        {
            let mut out = std::fs::File::create(&tmp)?;
            serde_json::to_writer(&mut out, &file)?;
            out.flush()?;
            out.sync_all()?;
        }
        std::fs::rename(&tmp, path)?;

        info!(
            path = %path.display(),
            entries = file.count,
            dimension = file.dimension,
            "Vector index saved"
        );
        Ok(())
    }

    /// Read an index written by [`VectorIndex::save`].
    ///
    /// The stored dimension must match `embedder`; a different model name
    /// with the same dimension is accepted with a warning.
    pub fn load(path: &Path, embedder: &dyn Embedder) -> Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| AppError::load(path.display(), format!("Cannot read index: {}", e)))?;
        let file: IndexFile = serde_json::from_slice(&raw)
            .map_err(|e| AppError::load(path.display(), format!("Malformed index: {}", e)))?;

        if file.format_version != FORMAT_VERSION {
            return Err(AppError::load(
                path.display(),
                format!(
                    "Unsupported format version {} (expected {})",
                    file.format_version, FORMAT_VERSION
                ),
            ));
        }

        let bytes = hex::decode(&file.vectors)
            .map_err(|e| AppError::load(path.display(), format!("Malformed vector data: {}", e)))?;

        let expected_bytes = file
            .count
            .checked_mul(file.dimension)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| {
                AppError::load(
                    path.display(),
                    format!(
                        "Inconsistent index: count {} by dimension {} overflows",
                        file.count, file.dimension
                    ),
                )
            })?;
        if bytes.len() != expected_bytes
            || file.texts.len() != file.count
            || file.metadata.len() != file.count
        {
            return Err(AppError::load(
                path.display(),
                format!(
                    "Inconsistent index: count {}, {} texts, {} metadata, {} vector bytes",
                    file.count,
                    file.texts.len(),
                    file.metadata.len(),
                    bytes.len()
                ),
            ));
        }

        if checksum(&bytes) != file.checksum {
            return Err(AppError::load(path.display(), "Vector checksum mismatch"));
        }

        if file.dimension != embedder.dimension() {
            return Err(AppError::DimensionMismatch {
                expected: embedder.dimension(),
                found: file.dimension,
            });
        }

        if file.model != embedder.model_name() {
            warn!(
                index_model = %file.model,
                embedder_model = %embedder.model_name(),
                "Index was built with a different embedding model"
            );
        }

        let vectors = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let index = Self {
            model: file.model,
            dimension: file.dimension,
            built_at: file.built_at,
            vectors,
            texts: file.texts,
            metadata: file.metadata,
        };

        record_index_size(index.len());
        info!(
            path = %path.display(),
            entries = index.len(),
            dimension = index.dimension,
            built_at = %index.built_at,
            "Vector index loaded"
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::{five_vector_index, five_vectors, TableEmbedder};
    use async_trait::async_trait;
    use serde_json::Value;

    struct RenamedEmbedder(TableEmbedder);

    #[async_trait]
    impl Embedder for RenamedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.0.embed(text).await
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.0.embed_batch(texts).await
        }
        fn model_name(&self) -> &str {
            "renamed"
        }
        fn dimension(&self) -> usize {
            self.0.dimension
        }
    }

    fn rewrite(path: &Path, edit: impl FnOnce(&mut Value)) {
        let mut value: Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        edit(&mut value);
        std::fs::write(path, serde_json::to_vec(&value).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_round_trip_preserves_search_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("index.json");
        let index = five_vector_index().await;
        index.save(&path).unwrap();

        let embedder = TableEmbedder::new(&five_vectors());
        let loaded = VectorIndex::load(&path, &embedder).unwrap();

        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.model(), index.model());
        assert_eq!(loaded.built_at(), index.built_at());
        for query in [[1.0, 0.0, 0.0], [0.2, 0.9, 0.3], [0.0, 0.0, 1.0]] {
            assert_eq!(loaded.search(&query, 5).unwrap(), index.search(&query, 5).unwrap());
        }
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        five_vector_index().await.save(&path).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("index.json")]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        five_vector_index().await.save(&path).unwrap();

        let embedder = TableEmbedder::new(&[("x", vec![1.0, 0.0])]);
        assert!(matches!(
            VectorIndex::load(&path, &embedder),
            Err(AppError::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[tokio::test]
    async fn test_different_model_same_dimension_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        five_vector_index().await.save(&path).unwrap();

        let embedder = RenamedEmbedder(TableEmbedder::new(&five_vectors()));
        let loaded = VectorIndex::load(&path, &embedder).unwrap();
        assert_eq!(loaded.model(), "table");
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        five_vector_index().await.save(&path).unwrap();
        rewrite(&path, |v| v["checksum"] = Value::from("00"));

        let embedder = TableEmbedder::new(&five_vectors());
        assert!(matches!(VectorIndex::load(&path, &embedder), Err(AppError::Load { .. })));
    }

    #[tokio::test]
    async fn test_unknown_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        five_vector_index().await.save(&path).unwrap();
        rewrite(&path, |v| v["format_version"] = Value::from(99));

        let embedder = TableEmbedder::new(&five_vectors());
        assert!(matches!(VectorIndex::load(&path, &embedder), Err(AppError::Load { .. })));
    }

    #[tokio::test]
    async fn test_inconsistent_counts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        five_vector_index().await.save(&path).unwrap();
        rewrite(&path, |v| {
            v["texts"].as_array_mut().unwrap().pop();
        });

        let embedder = TableEmbedder::new(&five_vectors());
        assert!(matches!(VectorIndex::load(&path, &embedder), Err(AppError::Load { .. })));
    }

    #[tokio::test]
    async fn test_oversized_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        five_vector_index().await.save(&path).unwrap();
        rewrite(&path, |v| {
            v["count"] = serde_json::json!(u64::MAX);
            v["dimension"] = serde_json::json!(u64::MAX);
        });

        let embedder = TableEmbedder::new(&five_vectors());
        assert!(matches!(VectorIndex::load(&path, &embedder), Err(AppError::Load { .. })));
    }

    #[test]
    fn test_missing_or_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = TableEmbedder::new(&five_vectors());

        let missing = dir.path().join("missing.json");
        assert!(matches!(VectorIndex::load(&missing, &embedder), Err(AppError::Load { .. })));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, b"{ not json").unwrap();
        assert!(matches!(VectorIndex::load(&garbage, &embedder), Err(AppError::Load { .. })));
    }

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(
            temp_path(Path::new("vectorstore/index.json")),
            PathBuf::from("vectorstore/index.json.tmp")
        );
    }
}
