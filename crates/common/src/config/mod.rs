//! Configuration management for LexRAG
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Corpus ingestion configuration
    pub ingestion: IngestionConfig,

    /// Persisted vector index configuration
    pub index: IndexConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Generative model configuration
    pub generation: GenerationConfig,

    /// Retrieval configuration
    pub retrieval: RetrievalConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Directory of paginated documents (None disables the PDF loader)
    pub pdf_dir: Option<PathBuf>,

    /// File extension matched inside `pdf_dir`
    pub pdf_extension: String,

    /// Line-delimited query/response record file (None disables the record loader)
    pub records_path: Option<PathBuf>,

    /// Window width in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive windows
    pub chunk_overlap: usize,

    /// Embedding batches in flight while building the index
    pub embed_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Location of the persisted index blob
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider: huggingface, openai, hashing
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    pub model: String,

    /// Embedding dimension
    pub dimension: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Texts per embedding request
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Generation provider: huggingface, openai
    pub provider: String,

    /// API key (falls back to HF_TOKEN)
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    pub model: String,

    /// Sampling temperature in [0, 1]
    pub temperature: f32,

    /// Maximum generated length
    pub max_output_length: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Custom prompt template with {context} and {question} placeholders
    pub prompt_template: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages retrieved per question
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    pub log_level: String,

    /// Enable JSON logging
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    pub metrics_port: u16,

    /// Service name for tracing
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_pdf_dir() -> Option<PathBuf> { Some(PathBuf::from("data")) }
fn default_pdf_extension() -> String { "pdf".to_string() }
fn default_records_path() -> Option<PathBuf> { Some(PathBuf::from("data/data.jsonl")) }
fn default_chunk_size() -> usize { 500 }
fn default_chunk_overlap() -> usize { 50 }
fn default_embed_concurrency() -> usize { 4 }
fn default_index_path() -> PathBuf { PathBuf::from("vectorstore/index.json") }
fn default_embedding_provider() -> String { "huggingface".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_batch_size() -> usize { 32 }
fn default_generation_provider() -> String { "huggingface".to_string() }
fn default_generation_model() -> String { "mistralai/Mistral-7B-Instruct-v0.3".to_string() }
fn default_temperature() -> f32 { 0.5 }
fn default_max_output_length() -> u32 { 512 }
fn default_generation_timeout() -> u64 { 60 }
fn default_top_k() -> usize { 3 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "lexrag".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            pdf_extension: default_pdf_extension(),
            records_path: default_records_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embed_concurrency: default_embed_concurrency(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            api_key: None,
            api_base: None,
            model: default_generation_model(),
            temperature: default_temperature(),
            max_output_length: default_max_output_length(),
            timeout_secs: default_generation_timeout(),
            prompt_template: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__INDEX__PATH=/srv/index.json
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.apply_token_fallback();
        Ok(config)
    }

    /// Load from a specific configuration file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.apply_token_fallback();
        Ok(config)
    }

    /// Hugging Face deployments ship the token as HF_TOKEN
    fn apply_token_fallback(&mut self) {
        if self.generation.api_key.is_none() {
            self.generation.api_key = std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty());
        }
        if self.embedding.api_key.is_none() && self.embedding.provider == "huggingface" {
            self.embedding.api_key = std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty());
        }
    }

    /// Check cross-field constraints the deserializer cannot express
    pub fn validate(&self) -> Result<()> {
        let ingestion = &self.ingestion;
        if ingestion.chunk_size == 0 {
            return Err(AppError::Configuration {
                message: "ingestion.chunk_size must be positive".to_string(),
            });
        }
        if ingestion.chunk_overlap >= ingestion.chunk_size {
            return Err(AppError::Configuration {
                message: format!(
                    "ingestion.chunk_overlap ({}) must be smaller than chunk_size ({})",
                    ingestion.chunk_overlap, ingestion.chunk_size
                ),
            });
        }
        if self.embedding.dimension == 0 {
            return Err(AppError::Configuration {
                message: "embedding.dimension must be positive".to_string(),
            });
        }
        if self.embedding.batch_size == 0 {
            return Err(AppError::Configuration {
                message: "embedding.batch_size must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.generation.temperature) {
            return Err(AppError::Configuration {
                message: format!(
                    "generation.temperature ({}) must be within [0, 1]",
                    self.generation.temperature
                ),
            });
        }
        if self.generation.max_output_length == 0 {
            return Err(AppError::Configuration {
                message: "generation.max_output_length must be positive".to_string(),
            });
        }
        if self.retrieval.top_k == 0 {
            return Err(AppError::Configuration {
                message: "retrieval.top_k must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}
