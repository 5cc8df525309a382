//! Identity commands and queries

use crate::mediator::Request;
use fitness_tracker_shared::{AuthTokens, IdentityDto, LoginRequest, RegisterRequest, UserId};
use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct RegisterCommand {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub display_name: Option<String>,
}

impl Request for RegisterCommand {
    const NAME: &'static str = "RegisterCommand";
    type Response = AuthTokens;
}

impl From<RegisterRequest> for RegisterCommand {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            display_name: req.display_name,
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct LoginCommand {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

impl Request for LoginCommand {
    const NAME: &'static str = "LoginCommand";
    type Response = AuthTokens;
}

impl From<LoginRequest> for LoginCommand {
    fn from(req: LoginRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct RefreshTokenCommand {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub refresh_token: String,
}

impl Request for RefreshTokenCommand {
    const NAME: &'static str = "RefreshTokenCommand";
    type Response = AuthTokens;
}

#[derive(Debug, Clone, Validate)]
pub struct GetCurrentIdentityQuery {
    pub user_id: UserId,
}

impl Request for GetCurrentIdentityQuery {
    const NAME: &'static str = "GetCurrentIdentityQuery";
    type Response = IdentityDto;
}

/// Lower-cased, trimmed email used as the account key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Display name given at registration, or the local part of the email
pub fn default_display_name(display_name: Option<&str>, email: &str) -> String {
    display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn register(email: &str, password: &str) -> RegisterCommand {
        RegisterCommand {
            email: email.to_string(),
            password: password.to_string(),
            display_name: None,
        }
    }

    #[rstest]
    #[case("runner@example.com", "longenough", true)]
    #[case("not-an-email", "longenough", false)]
    #[case("runner@example.com", "short", false)]
    #[case("runner@example.com", &"x".repeat(129), false)]
    #[case("runner@example.com", &"x".repeat(128), true)]
    fn test_register_validation(#[case] email: &str, #[case] password: &str, #[case] valid: bool) {
        assert_eq!(register(email, password).validate().is_ok(), valid);
    }

    #[test]
    fn test_empty_display_name_rejected() {
        let mut cmd = register("runner@example.com", "longenough");
        cmd.display_name = Some(String::new());
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Runner@Example.COM "), "runner@example.com");
    }

    #[rstest]
    #[case(Some("Coach Kim"), "kim@example.com", "Coach Kim")]
    #[case(Some("   "), "kim@example.com", "kim")]
    #[case(None, "kim@example.com", "kim")]
    fn test_default_display_name(#[case] given: Option<&str>, #[case] email: &str, #[case] expected: &str) {
        assert_eq!(default_display_name(given, email), expected);
    }
}
