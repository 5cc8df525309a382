//! Users routes
//!
//! GET  /api/v1/users/me
//! GET  /api/v1/users/:id              (self or admin)
//! GET  /api/v1/users/me/profile
//! PUT  /api/v1/users/me/profile
//! GET  /api/v1/users/me/metrics
//! POST /api/v1/users/me/metrics
//! GET  /api/v1/users/me/metrics/latest

use super::commands::{
    GetLatestUserMetricQuery, GetUserByIdQuery, GetUserMetricsQuery, GetUserProfileQuery,
    RecordUserMetricCommand, UpdateUserProfileCommand,
};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use fitness_tracker_shared::{
    MetricsHistoryParams, PagedResult, RecordMetricRequest, UpdateProfileRequest, UserDto, UserId,
    UserMetricDto, UserProfileDto,
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(current_user))
        .route("/me/profile", get(get_profile).put(update_profile))
        .route("/me/metrics", get(metrics_history).post(record_metric))
        .route("/me/metrics/latest", get(latest_metric))
        .route("/:id", get(user_by_id))
}

async fn current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UserDto>> {
    let user = state.mediator().send(GetUserByIdQuery(auth_user.user_id)).await?;
    Ok(Json(user))
}

async fn user_by_id(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<UserId>,
) -> ApiResult<Json<UserDto>> {
    auth_user.ensure_self_or_admin(id)?;
    let user = state.mediator().send(GetUserByIdQuery(id)).await?;
    Ok(Json(user))
}

async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UserProfileDto>> {
    let profile = state
        .mediator()
        .send(GetUserProfileQuery {
            user_id: auth_user.user_id,
        })
        .await?;
    Ok(Json(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfileDto>> {
    let profile = state
        .mediator()
        .send(UpdateUserProfileCommand::new(auth_user.user_id, req))
        .await?;
    Ok(Json(profile))
}

async fn metrics_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<MetricsHistoryParams>,
) -> ApiResult<Json<PagedResult<UserMetricDto>>> {
    let page = state
        .mediator()
        .send(GetUserMetricsQuery::new(auth_user.user_id, params))
        .await?;
    Ok(Json(page))
}

async fn record_metric(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<RecordMetricRequest>,
) -> ApiResult<(StatusCode, Json<UserMetricDto>)> {
    let metric = state
        .mediator()
        .send(RecordUserMetricCommand::new(auth_user.user_id, req))
        .await?;
    Ok((StatusCode::CREATED, Json(metric)))
}

async fn latest_metric(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UserMetricDto>> {
    let metric = state
        .mediator()
        .send(GetLatestUserMetricQuery {
            user_id: auth_user.user_id,
        })
        .await?;
    Ok(Json(metric))
}
