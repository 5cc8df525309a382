//! Feature modules
//!
//! Each module owns its tables and registers its request handlers with the
//! mediator. Modules talk to each other only through integration events.

pub mod exercises;
pub mod identity;
pub mod users;

use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::mediator::{Mediator, MediatorBuilder};
use crate::messaging::{
    GetMessagingStatsHandler, GetMessagingStatsQuery, InProcessEventBus, InboxProcessor,
    PgInboxStore, PgOutboxStore, Subscription,
};
use sqlx::PgPool;
use std::sync::Arc;

/// Mediator with the handlers of every module
pub fn build_mediator(pool: &PgPool, jwt: &JwtService, config: &AppConfig) -> Mediator {
    let builder = MediatorBuilder::new();
    let builder = identity::register_handlers(
        builder,
        identity::IdentityHandler::new(pool.clone(), jwt.clone(), Arc::new(config.admin.clone())),
    );
    let builder = users::register_handlers(
        builder,
        users::UsersHandler::new(pool.clone(), Arc::new(config.admin.clone())),
    );
    let builder =
        exercises::register_handlers(builder, exercises::ExercisesHandler::new(pool.clone()));

    let stats = GetMessagingStatsHandler::new(
        Arc::new(PgOutboxStore::new(pool.clone())),
        Arc::new(PgInboxStore::new(pool.clone())),
        config.outbox.max_attempts,
    );
    builder
        .register::<GetMessagingStatsQuery, _>(stats)
        .build()
}

/// In-process bus with every module's event consumers subscribed
pub fn in_process_bus(pool: &PgPool, config: &AppConfig) -> InProcessEventBus {
    let processor = InboxProcessor::new(
        Arc::new(PgInboxStore::new(pool.clone())),
        config.inbox.max_attempts,
    );

    InProcessEventBus::new(processor)
        .subscribe(Subscription::shared(users::UserRegisteredConsumer::new(pool.clone())))
}
