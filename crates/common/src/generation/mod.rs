//! Generative model abstraction
//!
//! A [`Generator`] turns a fully assembled prompt into answer text. Providers:
//! - Hugging Face text-generation inference (Mistral-7B-Instruct by default)
//! - OpenAI-compatible chat completions
//!
//! Clients are built once per process and reused across queries. No provider
//! retries internally; a failed call is reported to the caller as-is.

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sampling options passed with every generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature in [0, 1]
    pub temperature: f32,

    /// Maximum generated length (tokens)
    pub max_output_length: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_output_length: 512,
        }
    }
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_output_length: u32) -> Result<Self> {
        let options = Self {
            temperature,
            max_output_length,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(AppError::invalid_argument(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        if self.max_output_length == 0 {
            return Err(AppError::invalid_argument(
                "max_output_length must be positive",
            ));
        }
        Ok(())
    }
}

impl From<&GenerationConfig> for GenerationOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_length: config.max_output_length,
        }
    }
}

/// Trait for prompt completion
#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete a prompt
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

async fn read_error_body(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::Upstream {
        message: format!("LLM API error {}: {}", status, body),
    }
}

/// Hugging Face text-generation inference client
pub struct HuggingFaceGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct TextGenerationRequest<'a> {
    inputs: &'a str,
    parameters: TextGenerationParameters,
}

#[derive(Serialize)]
struct TextGenerationParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_new_tokens: u32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct TextGenerationOutput {
    generated_text: String,
}

impl HuggingFaceGenerator {
    pub fn new(
        api_key: Option<String>,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| "https://router.huggingface.co/hf-inference".to_string()),
        })
    }

    fn parameters(options: &GenerationOptions) -> TextGenerationParameters {
        // TGI rejects temperature == 0; greedy decoding is the equivalent.
        let sampling = options.temperature > 0.0;
        TextGenerationParameters {
            temperature: sampling.then_some(options.temperature),
            max_new_tokens: options.max_output_length,
            do_sample: sampling,
            return_full_text: false,
        }
    }
}

#[async_trait]
impl Generator for HuggingFaceGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let start = Instant::now();
        let url = format!("{}/models/{}", self.base_url, self.model);

        let result = async {
            let mut request = self.client.post(&url).json(&TextGenerationRequest {
                inputs: prompt,
                parameters: Self::parameters(options),
            });
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request.send().await.map_err(|e| AppError::Upstream {
                message: format!("LLM API request failed: {}", e),
            })?;

            if !response.status().is_success() {
                return Err(read_error_body(response).await);
            }

            let outputs: Vec<TextGenerationOutput> =
                response.json().await.map_err(|e| AppError::Upstream {
                    message: format!("Failed to parse LLM response: {}", e),
                })?;

            outputs
                .into_iter()
                .next()
                .map(|o| o.generated_text)
                .ok_or_else(|| AppError::Upstream {
                    message: "Empty response from LLM".to_string(),
                })
        }
        .await;

        metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIGenerator {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            endpoint: format!("{}/chat/completions", base_url),
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let start = Instant::now();

        let result = async {
            let request = ChatRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                max_tokens: options.max_output_length,
                temperature: options.temperature,
            };

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| AppError::Upstream {
                    message: format!("LLM API request failed: {}", e),
                })?;

            if !response.status().is_success() {
                return Err(read_error_body(response).await);
            }

            let chat_response: ChatResponse =
                response.json().await.map_err(|e| AppError::Upstream {
                    message: format!("Failed to parse LLM response: {}", e),
                })?;

            chat_response
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| AppError::Upstream {
                    message: "Empty response from LLM".to_string(),
                })
        }
        .await;

        metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Create a generator based on configuration.
///
/// Call once per process and share the returned handle.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.provider.as_str() {
        "huggingface" => Ok(Arc::new(HuggingFaceGenerator::new(
            config.api_key.clone(),
            config.model.clone(),
            config.api_base.clone(),
            timeout,
        )?)),
        "openai" => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "OpenAI API key required (generation.api_key)".to_string(),
            })?;
            Ok(Arc::new(OpenAIGenerator::new(
                key,
                config.model.clone(),
                config.api_base.clone(),
                timeout,
            )?))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown generation provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_validation() {
        assert!(GenerationOptions::new(0.0, 1).is_ok());
        assert!(GenerationOptions::new(1.0, 512).is_ok());
        assert!(matches!(
            GenerationOptions::new(1.01, 512),
            Err(AppError::InvalidArgument { .. })
        ));
        assert!(matches!(
            GenerationOptions::new(-0.1, 512),
            Err(AppError::InvalidArgument { .. })
        ));
        assert!(matches!(
            GenerationOptions::new(0.3, 0),
            Err(AppError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_zero_temperature_switches_to_greedy() {
        let params = HuggingFaceGenerator::parameters(&GenerationOptions::new(0.0, 64).unwrap());
        assert!(!params.do_sample);
        assert!(params.temperature.is_none());

        let params = HuggingFaceGenerator::parameters(&GenerationOptions::new(0.5, 64).unwrap());
        assert!(params.do_sample);
        assert_eq!(params.temperature, Some(0.5));
        assert!(!params.return_full_text);
    }

    #[test]
    fn test_create_generator_rejects_unknown_provider() {
        let config = GenerationConfig {
            provider: "carrier-pigeon".to_string(),
            ..GenerationConfig::default()
        };
        assert!(create_generator(&config).is_err());
    }

    #[test]
    fn test_options_from_config() {
        let config = GenerationConfig::default();
        let options = GenerationOptions::from(&config);
        assert_eq!(options.temperature, 0.5);
        assert_eq!(options.max_output_length, 512);
    }
}
