//! Route definitions for the Fitness Tracker API
//!
//! Module routers are nested under `/api/v1`; health probes and the
//! Prometheus scrape endpoint live at the root.

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::messaging::GetMessagingStatsQuery;
use crate::modules::{exercises, identity, users};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, Method},
    routing::get,
    Json, Router,
};
use fitness_tracker_shared::MessagingStatsDto;
use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod health;

/// Create the main application router with all middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .nest("/api/v1", api_routes())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /metrics` in the Prometheus text format
pub fn metrics_routes(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

/// API v1 routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "Fitness Tracker API v1" }))
        .nest("/identity", identity::identity_routes())
        .nest("/users", users::users_routes())
        .nest("/exercises", exercises::exercises_routes())
        .route("/admin/messaging", get(messaging_stats))
}

async fn messaging_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<MessagingStatsDto>> {
    let stats = state.mediator().send(GetMessagingStatsQuery).await?;
    Ok(Json(stats))
}
