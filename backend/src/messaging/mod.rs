//! Cross-module messaging
//!
//! Producers write integration events to the outbox inside their own
//! transaction. The [`OutboxRelay`] publishes them to the configured
//! [`EventBus`]es; the in-process bus hands them to consumers through the
//! inbox, which deduplicates and retries per consumer.

mod bus;
mod consumer;
pub mod events;
mod inbox;
#[cfg(test)]
pub(crate) mod memory;
mod outbox;
mod relay;
mod stats;

pub use bus::{EventBus, InProcessEventBus, RedisEventBus};
pub use consumer::{
    InboxOutcome, InboxProcessor, IntegrationEventConsumer, IntegrationEventHandler, Subscription,
};
pub use events::IntegrationEvent;
pub use inbox::{InboxCounts, InboxError, InboxMessage, InboxStatus, InboxStore, PgInboxStore};
pub use outbox::{OutboxCounts, OutboxError, OutboxMessage, OutboxStore, PgOutboxStore};
pub use relay::{BatchReport, OutboxRelay, OutboxRelayConfig};
pub use stats::{GetMessagingStatsHandler, GetMessagingStatsQuery};
