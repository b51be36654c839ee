//! Question answering engine
//!
//! Holds the retriever, generator and prompt built once at startup and
//! answers questions with them: retrieve, then generate.

use crate::answer::answer;
use crate::prompt::PromptTemplate;
use lexrag_common::config::AppConfig;
use lexrag_common::errors::{AppError, Result};
use lexrag_common::metrics::record_query;
use lexrag_common::{GenerationOptions, Generator, Metadata};
use lexrag_search::Retriever;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Per-request overrides of the engine defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOverrides {
    pub k: Option<usize>,
    pub temperature: Option<f32>,
    pub max_output_length: Option<u32>,
}

/// Answer text and the metadata of the passages it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub result: String,
    pub sources: Vec<Metadata>,
}

/// Long-lived question answering engine
pub struct QueryEngine {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    options: GenerationOptions,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        template: PromptTemplate,
        options: GenerationOptions,
        top_k: usize,
    ) -> Result<Self> {
        options.validate()?;
        if top_k == 0 {
            return Err(AppError::invalid_argument("top_k must be positive"));
        }
        Ok(Self {
            retriever,
            generator,
            template,
            options,
            top_k,
        })
    }

    /// Build from application configuration
    pub fn from_config(
        config: &AppConfig,
        retriever: Retriever,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let template = PromptTemplate::from_config(config.generation.prompt_template.as_deref())?;
        Self::new(
            retriever,
            generator,
            template,
            GenerationOptions::from(&config.generation),
            config.retrieval.top_k,
        )
    }

    /// Answer one question.
    ///
    /// `language` is recorded on the span only; it does not change the prompt.
    #[instrument(skip_all, fields(language = language.unwrap_or("en")))]
    pub async fn query(
        &self,
        text: &str,
        language: Option<&str>,
        overrides: QueryOverrides,
    ) -> Result<QueryResponse> {
        let question = text.trim();
        if question.is_empty() {
            return Err(AppError::invalid_argument("question text must not be empty"));
        }

        let k = overrides.k.unwrap_or(self.top_k);
        let options = GenerationOptions {
            temperature: overrides.temperature.unwrap_or(self.options.temperature),
            max_output_length: overrides
                .max_output_length
                .unwrap_or(self.options.max_output_length),
        };
        options.validate()?;

        let start = Instant::now();
        let retrieved = self.retriever.retrieve(question, k).await?;
        let answer = answer(
            question,
            &retrieved,
            self.generator.as_ref(),
            &options,
            &self.template,
        )
        .await?;

        let elapsed = start.elapsed();
        record_query(elapsed.as_secs_f64(), answer.sources.len());
        info!(
            k,
            retrieved = retrieved.len(),
            sources = answer.sources.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Question answered"
        );

        Ok(QueryResponse {
            result: answer.text,
            sources: answer.source_metadata,
        })
    }
}
