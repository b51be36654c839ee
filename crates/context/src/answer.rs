//! Answer assembly
//!
//! Turns a question and its retrieved passages into a single generation
//! call, then attaches the distinct sources the passages came from.

use crate::prompt::{build_context, PromptTemplate};
use lexrag_common::document::source_of;
use lexrag_common::errors::{AppError, Result};
use lexrag_common::{GenerationOptions, Generator, Metadata};
use lexrag_search::RetrievedChunk;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Generated answer with its citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Trimmed model output
    pub text: String,

    /// Distinct `source` identifiers in ranked order
    pub sources: Vec<String>,

    /// Distinct metadata of the cited passages in ranked order
    pub source_metadata: Vec<Metadata>,
}

/// Answer `question` from `retrieved` with exactly one generator call.
///
/// An empty `retrieved` still issues the call with an empty context.
#[instrument(skip_all, fields(passages = retrieved.len(), model = %generator.model_name()))]
pub async fn answer(
    question: &str,
    retrieved: &[RetrievedChunk],
    generator: &dyn Generator,
    options: &GenerationOptions,
    template: &PromptTemplate,
) -> Result<Answer> {
    options.validate()?;

    let context = build_context(retrieved);
    let prompt = template.render(&context, question);
    debug!(prompt_len = prompt.len(), "Prompt assembled");

    let output = generator.generate(&prompt, options).await.map_err(|e| {
        warn!(error = %e, "Generation failed");
        AppError::generation(e)
    })?;

    let (sources, source_metadata) = collect_sources(retrieved);

    Ok(Answer {
        text: output.trim().to_string(),
        sources,
        source_metadata,
    })
}

/// De-duplicate citations, keeping first-seen order.
///
/// Passages without a string `source` are not cited.
fn collect_sources(retrieved: &[RetrievedChunk]) -> (Vec<String>, Vec<Metadata>) {
    let mut sources: Vec<String> = Vec::new();
    let mut metadata: Vec<Metadata> = Vec::new();

    for chunk in retrieved {
        let Some(source) = source_of(&chunk.metadata) else {
            continue;
        };
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
            metadata.push(chunk.metadata.clone());
        }
    }

    (sources, metadata)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Generator that records every prompt and replies with a fixed text
    pub(crate) struct ScriptedGenerator {
        pub reply: std::result::Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|message| AppError::Upstream { message })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    pub(crate) fn passage(id: usize, text: &str, source: Option<&str>, page: u32) -> RetrievedChunk {
        let mut metadata = Metadata::new();
        if let Some(source) = source {
            metadata.insert("source".to_string(), json!(source));
        }
        metadata.insert("page".to_string(), json!(page));
        RetrievedChunk {
            id,
            text: text.to_string(),
            metadata,
            score: 1.0 - id as f32 * 0.1,
        }
    }

    #[tokio::test]
    async fn test_answer_is_trimmed_and_prompt_has_context() {
        let generator = ScriptedGenerator::replying("  A bargained-for exchange.\n");
        let retrieved = vec![passage(0, "Consideration is value.", Some("contracts.pdf"), 1)];

        let answer = answer(
            "What is consideration?",
            &retrieved,
            &generator,
            &GenerationOptions::default(),
            &PromptTemplate::default(),
        )
        .await
        .unwrap();

        assert_eq!(answer.text, "A bargained-for exchange.");
        assert_eq!(answer.sources, vec!["contracts.pdf"]);
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Context: Consideration is value.\nQuestion: What is consideration?"));
    }

    #[tokio::test]
    async fn test_empty_retrieval_still_calls_generator_once() {
        let generator = ScriptedGenerator::replying("I don't know.");
        let answer = answer(
            "What is estoppel?",
            &[],
            &generator,
            &GenerationOptions::default(),
            &PromptTemplate::default(),
        )
        .await
        .unwrap();

        assert_eq!(generator.calls(), 1);
        assert!(answer.sources.is_empty());
        assert!(answer.source_metadata.is_empty());
        assert!(generator.prompts.lock().unwrap()[0].contains("Context: \nQuestion: What is estoppel?"));
    }

    #[tokio::test]
    async fn test_sources_are_deduplicated_in_ranked_order() {
        let generator = ScriptedGenerator::replying("ok");
        let retrieved = vec![
            passage(0, "a", Some("torts.pdf"), 2),
            passage(1, "b", Some("JSONL"), 0),
            passage(2, "c", Some("torts.pdf"), 2),
            passage(3, "d", None, 0),
            passage(4, "e", Some("torts.pdf"), 5),
        ];

        let answer = answer(
            "q",
            &retrieved,
            &generator,
            &GenerationOptions::default(),
            &PromptTemplate::default(),
        )
        .await
        .unwrap();

        assert_eq!(answer.sources, vec!["torts.pdf", "JSONL"]);
        assert_eq!(answer.source_metadata.len(), answer.sources.len());
        assert_eq!(answer.source_metadata[0]["source"], json!("torts.pdf"));
        assert_eq!(answer.source_metadata[0]["page"], json!(2));
        assert_eq!(answer.source_metadata[1]["source"], json!("JSONL"));
    }

    #[tokio::test]
    async fn test_generator_failure_is_wrapped() {
        let generator = ScriptedGenerator::failing("model overloaded");
        let err = answer(
            "q",
            &[passage(0, "a", Some("s"), 0)],
            &generator,
            &GenerationOptions::default(),
            &PromptTemplate::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(generator.calls(), 1);
        assert!(matches!(err, AppError::Generation { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_invalid_options_skip_generation() {
        let generator = ScriptedGenerator::replying("ok");
        let options = GenerationOptions {
            temperature: 2.0,
            max_output_length: 10,
        };
        let err = answer("q", &[], &generator, &options, &PromptTemplate::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidArgument { .. }));
        assert_eq!(generator.calls(), 0);
    }
}
