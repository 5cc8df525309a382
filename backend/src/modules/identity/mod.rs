//! Identity module: accounts, credentials and token issuance
//!
//! Owns `identity_users`. Registration publishes `UserRegistered` through
//! the outbox; the Users module builds its own records from that event.

mod commands;
mod handlers;
mod repository;
mod routes;

pub use commands::{
    GetCurrentIdentityQuery, LoginCommand, RefreshTokenCommand, RegisterCommand,
};
pub use handlers::IdentityHandler;
pub use routes::identity_routes;

use crate::mediator::MediatorBuilder;

pub fn register_handlers(builder: MediatorBuilder, handler: IdentityHandler) -> MediatorBuilder {
    builder
        .register::<RegisterCommand, _>(handler.clone())
        .register::<LoginCommand, _>(handler.clone())
        .register::<RefreshTokenCommand, _>(handler.clone())
        .register::<GetCurrentIdentityQuery, _>(handler)
}
