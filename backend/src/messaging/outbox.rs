//! Producer side of the outbox pattern
//!
//! Modules write an [`OutboxMessage`] in the same transaction as the state
//! change it describes. The relay later publishes and marks it processed.

use super::events::IntegrationEvent;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// How long a claimed batch stays invisible to other relay instances
const CLAIM_LEASE_SECS: f64 = 60.0;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("Outbox message {0} is already processed")]
    AlreadyProcessed(Uuid),

    #[error("Expected a {expected} payload, found {actual}")]
    EventTypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("Invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Durable record of an integration event waiting to be published
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub event_type: String,
    /// JSON text of the event
    pub payload: String,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub correlation_id: Option<String>,
}

impl OutboxMessage {
    /// Wrap `event` in a new pending message
    pub fn create<E: IntegrationEvent>(event: &E) -> Result<Self, OutboxError> {
        Ok(Self {
            id: Uuid::new_v4(),
            event_type: E::EVENT_TYPE.to_string(),
            payload: serde_json::to_string(event)?,
            is_processed: false,
            created_at: Utc::now(),
            processed_at: None,
            attempts: 0,
            last_error: None,
            correlation_id: Some(event.correlation_id()),
        })
    }

    /// Decode the payload as `E`
    pub fn decode<E: IntegrationEvent>(&self) -> Result<E, OutboxError> {
        if self.event_type != E::EVENT_TYPE {
            return Err(OutboxError::EventTypeMismatch {
                expected: E::EVENT_TYPE,
                actual: self.event_type.clone(),
            });
        }
        Ok(serde_json::from_str(&self.payload)?)
    }

    pub fn mark_processed(&mut self, at: DateTime<Utc>) -> Result<(), OutboxError> {
        if self.is_processed {
            return Err(OutboxError::AlreadyProcessed(self.id));
        }
        self.is_processed = true;
        self.processed_at = Some(at);
        Ok(())
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.attempts += 1;
        self.last_error = Some(error.into());
    }

    /// Pending and still eligible for another publish attempt
    #[inline]
    pub fn is_deliverable(&self, max_attempts: i32) -> bool {
        !self.is_processed && self.attempts < max_attempts
    }
}

/// Outbox counters by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct OutboxCounts {
    pub pending: i64,
    pub processed: i64,
    pub exhausted: i64,
}

/// Storage used by the relay
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Claim up to `limit` deliverable messages, oldest first
    async fn fetch_pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<OutboxMessage>>;

    /// Returns false when the message was already processed
    async fn mark_processed(&self, id: Uuid) -> Result<bool>;

    /// Count a failed attempt and hide the message until `retry_after` has passed
    async fn record_failure(&self, id: Uuid, error: &str, retry_after: Duration) -> Result<()>;

    async fn counts(&self, max_attempts: i32) -> Result<OutboxCounts>;
}

/// Postgres-backed outbox
#[derive(Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a message using the caller's executor, usually an open transaction
    pub async fn insert<'e, E>(executor: E, message: &OutboxMessage) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO outbox_messages
                (id, event_type, payload, is_processed, created_at, attempts, correlation_id)
            VALUES ($1, $2, $3, FALSE, $4, 0, $5)
            "#,
        )
        .bind(message.id)
        .bind(&message.event_type)
        .bind(&message.payload)
        .bind(message.created_at)
        .bind(&message.correlation_id)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch_pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<OutboxMessage>> {
        // Rows locked by a concurrent claim are skipped; the lease hides
        // claimed rows until they are marked or their lease runs out.
        let mut messages = sqlx::query_as::<_, OutboxMessage>(
            r#"
            UPDATE outbox_messages
            SET locked_until = NOW() + make_interval(secs => $3)
            WHERE id IN (
                SELECT id
                FROM outbox_messages
                WHERE is_processed = FALSE
                  AND attempts < $2
                  AND (locked_until IS NULL OR locked_until < NOW())
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, event_type, payload, is_processed, created_at, processed_at,
                      attempts, last_error, correlation_id
            "#,
        )
        .bind(limit)
        .bind(max_attempts)
        .bind(CLAIM_LEASE_SECS)
        .fetch_all(&self.pool)
        .await?;

        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn mark_processed(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_messages
            SET is_processed = TRUE, processed_at = NOW(), locked_until = NULL
            WHERE id = $1 AND is_processed = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_failure(&self, id: Uuid, error: &str, retry_after: Duration) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE outbox_messages
            SET attempts = attempts + 1,
                last_error = $2,
                locked_until = NOW() + make_interval(secs => $3)
            WHERE id = $1 AND is_processed = FALSE
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(retry_after.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn counts(&self, max_attempts: i32) -> Result<OutboxCounts> {
        let counts = sqlx::query_as::<_, OutboxCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE NOT is_processed AND attempts < $1) AS pending,
                COUNT(*) FILTER (WHERE is_processed) AS processed,
                COUNT(*) FILTER (WHERE NOT is_processed AND attempts >= $1) AS exhausted
            FROM outbox_messages
            "#,
        )
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
