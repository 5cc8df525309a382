//! Authentication extractors
//!
//! [`AuthUser`] validates the Bearer token with the pre-computed keys held
//! in [`AppState`]. [`AdminUser`] additionally requires the admin role.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::FromRef,
    http::{header::AUTHORIZATION, request::Parts},
};
use fitness_tracker_shared::{UserId, UserRole};

/// Authenticated user extracted from the access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Allow access to `owner`'s data for the owner and for admins
    pub fn ensure_self_or_admin(&self, owner: UserId) -> Result<(), ApiError> {
        if self.user_id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Access to another user's data".to_string()))
        }
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization format".to_string()))?;

        let claims = app_state
            .jwt()
            .validate_access_token(token)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Authenticated user holding the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: UserId::new(),
            email: "athlete@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_self_access_allowed() {
        let me = user(UserRole::User);
        assert!(me.ensure_self_or_admin(me.user_id).is_ok());
    }

    #[test]
    fn test_other_user_access_forbidden() {
        let me = user(UserRole::User);
        assert!(matches!(
            me.ensure_self_or_admin(UserId::new()),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_can_access_anyone() {
        let admin = user(UserRole::Admin);
        assert!(admin.is_admin());
        assert!(admin.ensure_self_or_admin(UserId::new()).is_ok());
    }
}
