//! Health check endpoints
//!
//! - /health: process is up
//! - /health/ready: dependencies reachable (503 otherwise)
//! - /health/live: always OK while the server runs

use crate::messaging::{OutboxStore, PgOutboxStore};
use crate::{db, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

const SERVICE: &str = "fitness-tracker";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<HealthChecks>,
}

impl HealthResponse {
    fn new(status: &'static str, checks: Option<HealthChecks>) -> Self {
        Self {
            status,
            service: SERVICE,
            version: env!("CARGO_PKG_VERSION"),
            checks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: CheckStatus,
    /// Informational; a backlog does not make the service unready
    pub outbox: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckStatus {
    fn healthy(message: Option<String>) -> Self {
        Self {
            healthy: true,
            message,
        }
    }

    fn unhealthy(message: String) -> Self {
        Self {
            healthy: false,
            message: Some(message),
        }
    }
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::new("healthy", None))
}

pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = match db::health_check(state.db()).await {
        Ok(()) => CheckStatus::healthy(None),
        Err(e) => CheckStatus::unhealthy(e.to_string()),
    };

    let outbox = match PgOutboxStore::new(state.db().clone())
        .counts(state.config().outbox.max_attempts)
        .await
    {
        Ok(counts) => CheckStatus::healthy(Some(format!(
            "{} pending, {} exhausted",
            counts.pending, counts.exhausted
        ))),
        Err(e) => CheckStatus::unhealthy(e.to_string()),
    };

    let ready = database.healthy;
    let response = HealthResponse::new(
        if ready { "ready" } else { "not_ready" },
        Some(HealthChecks { database, outbox }),
    );

    if ready {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

pub async fn liveness_check() -> Json<HealthResponse> {
    Json(HealthResponse::new("alive", None))
}
