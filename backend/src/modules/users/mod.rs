//! Users module: accounts, profiles and body metrics
//!
//! Owns `users`, `user_profiles` and `user_metrics`. Accounts appear here
//! once the `UserRegistered` event from Identity has been consumed.

mod commands;
mod consumer;
mod handlers;
mod repository;
mod routes;

pub use commands::{
    GetLatestUserMetricQuery, GetUserByIdQuery, GetUserMetricsQuery, GetUserProfileQuery,
    RecordUserMetricCommand, UpdateUserProfileCommand,
};
pub use consumer::UserRegisteredConsumer;
pub use handlers::UsersHandler;
pub use routes::users_routes;

use crate::mediator::MediatorBuilder;

pub fn register_handlers(builder: MediatorBuilder, handler: UsersHandler) -> MediatorBuilder {
    builder
        .register::<GetUserByIdQuery, _>(handler.clone())
        .register::<GetUserProfileQuery, _>(handler.clone())
        .register::<GetLatestUserMetricQuery, _>(handler.clone())
        .register::<GetUserMetricsQuery, _>(handler.clone())
        .register::<UpdateUserProfileCommand, _>(handler.clone())
        .register::<RecordUserMetricCommand, _>(handler)
}
