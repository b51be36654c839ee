//! Prompt construction

use lexrag_common::errors::{AppError, Result};
use lexrag_search::RetrievedChunk;

/// Placeholder replaced by the retrieved passages
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Placeholder replaced by the user's question
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// Template used when none is configured
pub const DEFAULT_TEMPLATE: &str = "Answer the question using only the provided context. \
Be direct and concise.\nContext: {context}\nQuestion: {question}\nAnswer: ";

/// Separator between passages in the context block
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// A prompt with `{context}` and `{question}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Accept a custom template; both placeholders must be present.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(AppError::invalid_argument(format!(
                    "Prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { template })
    }

    /// The configured template, or the default when `None`
    pub fn from_config(template: Option<&str>) -> Result<Self> {
        match template {
            Some(t) => Self::new(t),
            None => Ok(Self::default()),
        }
    }

    /// Substitute both placeholders in one left-to-right pass.
    ///
    /// Placeholder text appearing inside `context` or `question` is left as is.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        loop {
            let next = [
                (rest.find(CONTEXT_PLACEHOLDER), CONTEXT_PLACEHOLDER, context),
                (rest.find(QUESTION_PLACEHOLDER), QUESTION_PLACEHOLDER, question),
            ]
            .into_iter()
            .filter_map(|(pos, placeholder, value)| pos.map(|p| (p, placeholder, value)))
            .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, placeholder, value)) => {
                    out.push_str(&rest[..pos]);
                    out.push_str(value);
                    rest = &rest[pos + placeholder.len()..];
                }
                None => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }
}

/// Join passage texts in ranked order
pub fn build_context(retrieved: &[RetrievedChunk]) -> String {
    retrieved
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}
