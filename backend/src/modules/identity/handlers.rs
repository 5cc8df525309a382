//! Identity request handlers

use super::commands::{
    default_display_name, normalize_email, GetCurrentIdentityQuery, LoginCommand,
    RefreshTokenCommand, RegisterCommand,
};
use super::repository::IdentityRepository;
use crate::auth::{JwtService, PasswordService};
use crate::config::AdminSettings;
use crate::error::{ApiError, ApiResult};
use crate::mediator::RequestHandler;
use crate::messaging::events::UserRegistered;
use crate::messaging::{OutboxMessage, PgOutboxStore};
use async_trait::async_trait;
use chrono::Utc;
use fitness_tracker_shared::{AuthTokens, IdentityDto, UserId, UserRole};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Handles every Identity request; cheap to clone
#[derive(Clone)]
pub struct IdentityHandler {
    pool: PgPool,
    jwt: JwtService,
    admin: Arc<AdminSettings>,
}

impl IdentityHandler {
    pub fn new(pool: PgPool, jwt: JwtService, admin: Arc<AdminSettings>) -> Self {
        Self { pool, jwt, admin }
    }

    fn role_for(&self, email: &str) -> UserRole {
        if self.admin.is_admin(email) {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }

    fn issue_tokens(&self, user_id: UserId, email: &str) -> ApiResult<AuthTokens> {
        let role = self.role_for(email);
        Ok(AuthTokens {
            access_token: self.jwt.generate_access_token(user_id, email, role)?,
            refresh_token: self.jwt.generate_refresh_token(user_id, email, role)?,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_secs(),
        })
    }
}

#[async_trait]
impl RequestHandler<RegisterCommand> for IdentityHandler {
    async fn handle(&self, cmd: RegisterCommand) -> ApiResult<AuthTokens> {
        let email = normalize_email(&cmd.email);

        if IdentityRepository::email_exists(&self.pool, &email).await? {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let password_hash = PasswordService::hash_async(cmd.password).await?;
        let user_id = UserId::from(Uuid::new_v4());

        let event = UserRegistered {
            user_id,
            email: email.clone(),
            display_name: default_display_name(cmd.display_name.as_deref(), &email),
            role: self.role_for(&email),
            occurred_at: Utc::now(),
        };
        let message = OutboxMessage::create(&event).map_err(|e| ApiError::Internal(e.into()))?;

        // The account and its event commit together
        let mut tx = self.pool.begin().await?;
        IdentityRepository::create(&mut *tx, user_id.as_uuid(), &email, &password_hash)
            .await?
            .ok_or_else(|| ApiError::Conflict("Email already registered".to_string()))?;
        PgOutboxStore::insert(&mut *tx, &message).await?;
        tx.commit().await?;

        info!(user_id = %user_id, role = %event.role.as_str(), "Account registered");
        self.issue_tokens(user_id, &email)
    }
}

#[async_trait]
impl RequestHandler<LoginCommand> for IdentityHandler {
    async fn handle(&self, cmd: LoginCommand) -> ApiResult<AuthTokens> {
        let email = normalize_email(&cmd.email);

        let account = IdentityRepository::find_by_email(&self.pool, &email)
            .await?
            .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !PasswordService::verify_async(cmd.password, account.password_hash).await? {
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.issue_tokens(UserId::from(account.id), &account.email)
    }
}

#[async_trait]
impl RequestHandler<RefreshTokenCommand> for IdentityHandler {
    async fn handle(&self, cmd: RefreshTokenCommand) -> ApiResult<AuthTokens> {
        let claims = self
            .jwt
            .validate_refresh_token(&cmd.refresh_token)
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;

        // Deleted accounts cannot refresh; the role is recomputed from settings
        let account = IdentityRepository::find_by_id(&self.pool, user_id.as_uuid())
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

        self.issue_tokens(user_id, &account.email)
    }
}

#[async_trait]
impl RequestHandler<GetCurrentIdentityQuery> for IdentityHandler {
    async fn handle(&self, query: GetCurrentIdentityQuery) -> ApiResult<IdentityDto> {
        let account = IdentityRepository::find_by_id(&self.pool, query.user_id.as_uuid())
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

        Ok(IdentityDto {
            id: UserId::from(account.id),
            role: self.role_for(&account.email),
            email: account.email,
            created_at: account.created_at,
        })
    }
}
