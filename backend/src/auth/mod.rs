//! Authentication glue
//!
//! Bearer tokens signed with the configured JWT settings, argon2 password
//! hashing, and the axum extractors that turn a token into an [`AuthUser`].

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtService};
pub use middleware::{AdminUser, AuthUser};
pub use password::PasswordService;
