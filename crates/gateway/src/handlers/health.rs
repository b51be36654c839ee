//! Health check handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub index: IndexCheck,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexCheck {
    pub status: String,
    pub entries: usize,
    pub dimension: usize,
    pub model: String,
    pub built_at: String,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - reports the loaded index
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let info = &state.index;

    let index_status = if info.entries > 0 { "up" } else { "empty" };

    Json(ReadyResponse {
        status: "ready".to_string(),
        service: state.config.observability.service_name.clone(),
        version: lexrag_common::VERSION.to_string(),
        checks: HealthChecks {
            index: IndexCheck {
                status: index_status.to_string(),
                entries: info.entries,
                dimension: info.dimension,
                model: info.model.clone(),
                built_at: info.built_at.to_rfc3339(),
            },
        },
    })
}
