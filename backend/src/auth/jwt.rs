//! JWT token generation and validation
//!
//! Access and refresh tokens carry the account id, email and role, and are
//! bound to the configured issuer and audience.

use crate::config::JwtSettings;
use anyhow::Result;
use chrono::{Duration, Utc};
use fitness_tracker_shared::{UserId, UserRole};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iss: String,
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token type: "access" or "refresh"
    pub token_type: String,
}

/// Pre-computed JWT keys
#[derive(Clone)]
struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

/// JWT service for token operations
///
/// Keys and validation rules are built once at startup and shared by
/// cloning (all heavy fields are behind `Arc`).
#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    validation: Arc<Validation>,
    issuer: String,
    audience: String,
    access_expiry: Duration,
    refresh_expiry: Duration,
}

impl JwtService {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);

        Self {
            keys: JwtKeys::new(settings.secret_key.expose_secret()),
            validation: Arc::new(validation),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            access_expiry: Duration::hours(settings.expiration_hours),
            refresh_expiry: Duration::hours(settings.refresh_expiration_hours),
        }
    }

    /// Generate an access token
    #[inline]
    pub fn generate_access_token(&self, user_id: UserId, email: &str, role: UserRole) -> Result<String> {
        self.generate_token(user_id, email, role, ACCESS, self.access_expiry)
    }

    /// Generate a refresh token
    #[inline]
    pub fn generate_refresh_token(&self, user_id: UserId, email: &str, role: UserRole) -> Result<String> {
        self.generate_token(user_id, email, role, REFRESH, self.refresh_expiry)
    }

    fn generate_token(
        &self,
        user_id: UserId,
        email: &str,
        role: UserRole,
        token_type: &str,
        expiry: Duration,
    ) -> Result<String> {
        let now = Utc::now();

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + expiry).timestamp(),
            iat: now.timestamp(),
            token_type: token_type.to_string(),
        };

        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to generate {} token: {}", token_type, e))
    }

    /// Validate signature, expiry, issuer and audience
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.keys.decoding, &self.validation)
            .map_err(|e| anyhow::anyhow!("Invalid token: {}", e))?;

        Ok(token_data.claims)
    }

    #[inline]
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        self.validate_typed(token, ACCESS)
    }

    #[inline]
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims> {
        self.validate_typed(token, REFRESH)
    }

    fn validate_typed(&self, token: &str, expected: &str) -> Result<Claims> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(anyhow::anyhow!("Not an {} token", expected));
        }
        Ok(claims)
    }

    /// Access token lifetime in seconds
    #[inline]
    pub fn access_token_expiry_secs(&self) -> i64 {
        self.access_expiry.num_seconds()
    }
}
