//! Event buses the relay publishes to

use super::consumer::{InboxProcessor, IntegrationEventConsumer};
use super::outbox::OutboxMessage;
use anyhow::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[async_trait]
pub trait EventBus: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver one message; an error makes the relay retry it later
    async fn publish(&self, message: &OutboxMessage, trace_id: Uuid) -> Result<()>;
}

/// Delivers events to the consumers of other modules through the inbox
pub struct InProcessEventBus {
    consumers: HashMap<&'static str, Vec<Arc<dyn IntegrationEventConsumer>>>,
    processor: InboxProcessor,
}

impl InProcessEventBus {
    pub fn new(processor: InboxProcessor) -> Self {
        Self {
            consumers: HashMap::new(),
            processor,
        }
    }

    pub fn subscribe(mut self, consumer: Arc<dyn IntegrationEventConsumer>) -> Self {
        debug!(
            consumer = consumer.name(),
            event_type = consumer.event_type(),
            "Consumer subscribed"
        );
        self.consumers
            .entry(consumer.event_type())
            .or_default()
            .push(consumer);
        self
    }

    pub fn consumer_count(&self, event_type: &str) -> usize {
        self.consumers.get(event_type).map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    fn name(&self) -> &'static str {
        "in_process"
    }

    async fn publish(&self, message: &OutboxMessage, trace_id: Uuid) -> Result<()> {
        let Some(consumers) = self.consumers.get(message.event_type.as_str()) else {
            debug!(event_type = %message.event_type, "No in-process consumers");
            return Ok(());
        };

        // Every consumer gets its turn; the inbox skips the ones that
        // already succeeded when the message comes back.
        let mut failures = Vec::new();
        for consumer in consumers {
            if let Err(e) = self
                .processor
                .process(message, consumer.as_ref(), trace_id)
                .await
            {
                failures.push(format!("{:#}", e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(failures.join("; ")))
        }
    }
}

/// Envelope published to Redis
#[derive(Debug, Serialize)]
struct RedisEnvelope<'a> {
    id: Uuid,
    event_type: &'a str,
    correlation_id: Option<&'a str>,
    trace_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    payload: serde_json::Value,
}

/// Mirrors every event to the pub/sub channel `<prefix>.<EventType>`
#[derive(Clone)]
pub struct RedisEventBus {
    conn: ConnectionManager,
    channel_prefix: String,
}

impl RedisEventBus {
    pub fn new(conn: ConnectionManager, channel_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            channel_prefix: channel_prefix.into(),
        }
    }

    pub fn channel_for(&self, event_type: &str) -> String {
        channel_name(&self.channel_prefix, event_type)
    }
}

fn channel_name(prefix: &str, event_type: &str) -> String {
    let prefix = prefix.trim_end_matches('.');
    if prefix.is_empty() {
        event_type.to_string()
    } else {
        format!("{}.{}", prefix, event_type)
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn publish(&self, message: &OutboxMessage, trace_id: Uuid) -> Result<()> {
        let envelope = RedisEnvelope {
            id: message.id,
            event_type: &message.event_type,
            correlation_id: message.correlation_id.as_deref(),
            trace_id,
            created_at: message.created_at,
            payload: serde_json::from_str(&message.payload)?,
        };
        let body = serde_json::to_string(&envelope)?;
        let channel = self.channel_for(&message.event_type);

        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(&channel, body).await?;
        if receivers == 0 {
            warn!(channel = %channel, "Event published with no Redis subscribers");
        }
        Ok(())
    }
}
