//! Event consumers and the inbox processor that runs them

use super::events::IntegrationEvent;
use super::inbox::{InboxMessage, InboxStatus, InboxStore};
use super::outbox::OutboxMessage;
use anyhow::Result;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Receives raw outbox messages of one event type
#[async_trait]
pub trait IntegrationEventConsumer: Send + Sync {
    /// Unique name; part of the inbox dedup key
    fn name(&self) -> &'static str;

    fn event_type(&self) -> &'static str;

    async fn consume(&self, message: &OutboxMessage) -> Result<()>;
}

/// Typed handler for one integration event
#[async_trait]
pub trait IntegrationEventHandler<E: IntegrationEvent>: Send + Sync + 'static {
    const NAME: &'static str;

    async fn handle(&self, event: E) -> Result<()>;
}

/// Adapts an [`IntegrationEventHandler`] to [`IntegrationEventConsumer`]
pub struct Subscription<E, H> {
    handler: H,
    _event: PhantomData<fn() -> E>,
}

impl<E, H> Subscription<E, H>
where
    E: IntegrationEvent,
    H: IntegrationEventHandler<E>,
{
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _event: PhantomData,
        }
    }

    pub fn shared(handler: H) -> Arc<dyn IntegrationEventConsumer> {
        Arc::new(Self::new(handler))
    }
}

#[async_trait]
impl<E, H> IntegrationEventConsumer for Subscription<E, H>
where
    E: IntegrationEvent,
    H: IntegrationEventHandler<E>,
{
    fn name(&self) -> &'static str {
        H::NAME
    }

    fn event_type(&self) -> &'static str {
        E::EVENT_TYPE
    }

    async fn consume(&self, message: &OutboxMessage) -> Result<()> {
        let event = message.decode::<E>()?;
        self.handler.handle(event).await
    }
}

/// What happened to one (message, consumer) delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxOutcome {
    Processed,
    /// Already processed earlier
    Duplicate,
    /// Attempt limit reached; the message is dropped for this consumer
    GaveUp,
}

/// Records deliveries in the inbox and runs consumers at most once per success
#[derive(Clone)]
pub struct InboxProcessor {
    store: Arc<dyn InboxStore>,
    max_attempts: i32,
}

impl InboxProcessor {
    pub fn new(store: Arc<dyn InboxStore>, max_attempts: i32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Deliver `message` to `consumer`
    ///
    /// A consumer failure is recorded and returned as an error so the
    /// message is offered again, until the inbox attempt limit is reached.
    pub async fn process(
        &self,
        message: &OutboxMessage,
        consumer: &dyn IntegrationEventConsumer,
        trace_id: Uuid,
    ) -> Result<InboxOutcome> {
        let consumer_name = consumer.name();
        let mut record = self
            .store
            .receive(InboxMessage::receive(message, consumer_name, trace_id))
            .await?;

        if record.status == InboxStatus::Processed {
            debug!(message_id = %message.id, consumer = consumer_name, "Skipping duplicate delivery");
            metrics::counter!("inbox_duplicates_total", "consumer" => consumer_name).increment(1);
            return Ok(InboxOutcome::Duplicate);
        }

        if record.is_exhausted(self.max_attempts) {
            warn!(
                message_id = %message.id,
                consumer = consumer_name,
                attempts = record.attempts,
                "Inbox attempts exhausted, giving up"
            );
            return Ok(InboxOutcome::GaveUp);
        }

        record.trace_id = Some(trace_id);

        match consumer.consume(message).await {
            Ok(()) => {
                record.mark_processed()?;
                self.store.save(&record).await?;
                metrics::counter!("inbox_messages_processed_total", "consumer" => consumer_name)
                    .increment(1);
                debug!(message_id = %message.id, consumer = consumer_name, "Inbox message processed");
                Ok(InboxOutcome::Processed)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                record.mark_failed(reason.clone())?;
                self.store.save(&record).await?;
                metrics::counter!("inbox_failures_total", "consumer" => consumer_name).increment(1);

                if record.is_exhausted(self.max_attempts) {
                    error!(
                        message_id = %message.id,
                        consumer = consumer_name,
                        attempts = record.attempts,
                        error = %reason,
                        "Consumer failed for the last time, giving up"
                    );
                    return Ok(InboxOutcome::GaveUp);
                }

                warn!(
                    message_id = %message.id,
                    consumer = consumer_name,
                    attempts = record.attempts,
                    error = %reason,
                    "Consumer failed, will retry"
                );
                Err(e.context(format!("Consumer {} failed", consumer_name)))
            }
        }
    }
}
