//! Question answering handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use lexrag_common::{
    errors::{AppError, Result},
    metrics::RequestMetrics,
    Metadata,
};
use lexrag_context::QueryOverrides;

/// Query request
#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 4000))]
    pub text: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Passages to retrieve (defaults to `retrieval.top_k`)
    #[serde(default)]
    pub k: Option<i64>,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: Option<f32>,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_output_length: Option<u32>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Query response
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponseBody {
    pub result: String,
    pub sources: Vec<Metadata>,
}

impl QueryRequest {
    fn overrides(&self) -> Result<QueryOverrides> {
        let k = match self.k {
            Some(k) if k <= 0 => {
                return Err(AppError::invalid_argument(format!("k must be positive, got {}", k)));
            }
            Some(k) => Some(usize::try_from(k).map_err(|_| AppError::invalid_argument("k is too large"))?),
            None => None,
        };

        Ok(QueryOverrides {
            k,
            temperature: self.temperature,
            max_output_length: self.max_output_length,
        })
    }
}

/// Answer a legal question from the indexed corpus
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponseBody>> {
    let metrics = RequestMetrics::start("POST", "/query");
    let start = Instant::now();

    let outcome = answer(&state, &request).await;

    let status = match &outcome {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    };
    metrics.finish(status);

    let response = outcome?;

    tracing::info!(
        language = %request.language,
        sources = response.sources.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Query completed"
    );

    Ok(Json(response))
}

async fn answer(state: &AppState, request: &QueryRequest) -> Result<QueryResponseBody> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let overrides = request.overrides()?;
    let response = state
        .engine
        .query(&request.text, Some(&request.language), overrides)
        .await?;

    Ok(QueryResponseBody {
        result: response.result,
        sources: response.sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(k: Option<i64>) -> QueryRequest {
        QueryRequest {
            text: "What is consideration?".to_string(),
            language: default_language(),
            k,
            temperature: None,
            max_output_length: None,
        }
    }

    #[test]
    fn test_non_positive_k_is_rejected() {
        for k in [0, -3] {
            assert!(matches!(
                request(Some(k)).overrides(),
                Err(AppError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn test_positive_k_is_passed_through() {
        assert_eq!(request(Some(5)).overrides().unwrap().k, Some(5));
        assert_eq!(request(None).overrides().unwrap().k, None);
    }

    #[test]
    fn test_request_validation() {
        let mut req = request(None);
        assert!(req.validate().is_ok());

        req.text = String::new();
        assert!(req.validate().is_err());

        let mut req = request(None);
        req.temperature = Some(1.5);
        assert!(req.validate().is_err());

        let mut req = request(None);
        req.max_output_length = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_language_defaults_to_english() {
        let req: QueryRequest = serde_json::from_str(r#"{"text": "What is a tort?"}"#).unwrap();
        assert_eq!(req.language, "en");
        assert_eq!(req.k, None);
    }
}
