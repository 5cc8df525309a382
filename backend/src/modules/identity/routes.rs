//! Identity routes
//!
//! POST /api/v1/identity/register
//! POST /api/v1/identity/login
//! POST /api/v1/identity/refresh
//! GET  /api/v1/identity/me

use super::commands::{GetCurrentIdentityQuery, LoginCommand, RefreshTokenCommand, RegisterCommand};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fitness_tracker_shared::{AuthTokens, IdentityDto, LoginRequest, RefreshTokenRequest, RegisterRequest};

pub fn identity_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/me", get(current_identity))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthTokens>)> {
    let tokens = state.mediator().send(RegisterCommand::from(req)).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let tokens = state.mediator().send(LoginCommand::from(req)).await?;
    Ok(Json(tokens))
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let tokens = state
        .mediator()
        .send(RefreshTokenCommand {
            refresh_token: req.refresh_token,
        })
        .await?;
    Ok(Json(tokens))
}

async fn current_identity(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<IdentityDto>> {
    let identity = state
        .mediator()
        .send(GetCurrentIdentityQuery {
            user_id: auth_user.user_id,
        })
        .await?;
    Ok(Json(identity))
}
