//! Consumer side of the outbox pattern
//!
//! One [`InboxMessage`] exists per (outbox message, consumer) pair. It
//! deduplicates redeliveries and tracks retries of the consumer.

use super::outbox::OutboxMessage;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_tracker_shared::ParseError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Processing state of an inbox record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxStatus {
    Pending,
    Processed,
    Failed,
}

impl InboxStatus {
    pub const ALL: [InboxStatus; 3] = [Self::Pending, Self::Processed, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Processed is terminal; a failed record may fail again or succeed
    pub fn can_transition_to(self, next: InboxStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processed)
                | (Self::Pending, Self::Failed)
                | (Self::Failed, Self::Failed)
                | (Self::Failed, Self::Processed)
        )
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        self == Self::Processed
    }
}

impl fmt::Display for InboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InboxStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(ParseError::InboxStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InboxError {
    #[error("Inbox record cannot move from {from} to {to}")]
    InvalidTransition { from: InboxStatus, to: InboxStatus },
}

/// Consumer-side record of a delivered integration event
#[derive(Debug, Clone, PartialEq)]
pub struct InboxMessage {
    pub id: Uuid,
    /// Id of the outbox message
    pub message_id: Uuid,
    pub consumer: String,
    pub event_type: String,
    pub payload: String,
    pub status: InboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub correlation_id: Option<String>,
    pub trace_id: Option<Uuid>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl InboxMessage {
    /// New pending record for `consumer`
    pub fn receive(message: &OutboxMessage, consumer: &str, trace_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_id: message.id,
            consumer: consumer.to_string(),
            event_type: message.event_type.clone(),
            payload: message.payload.clone(),
            status: InboxStatus::Pending,
            attempts: 0,
            last_error: None,
            correlation_id: message.correlation_id.clone(),
            trace_id: Some(trace_id),
            received_at: Utc::now(),
            processed_at: None,
        }
    }

    fn transition(&mut self, next: InboxStatus) -> Result<(), InboxError> {
        if !self.status.can_transition_to(next) {
            return Err(InboxError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_processed(&mut self) -> Result<(), InboxError> {
        self.transition(InboxStatus::Processed)?;
        self.attempts += 1;
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), InboxError> {
        self.transition(InboxStatus::Failed)?;
        self.attempts += 1;
        self.last_error = Some(error.into());
        Ok(())
    }

    /// No further attempts will be made
    #[inline]
    pub fn is_exhausted(&self, max_attempts: i32) -> bool {
        self.status == InboxStatus::Failed && self.attempts >= max_attempts
    }
}

/// Row shape of `inbox_messages`
#[derive(Debug, sqlx::FromRow)]
struct InboxRecord {
    id: Uuid,
    message_id: Uuid,
    consumer: String,
    event_type: String,
    payload: String,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    correlation_id: Option<String>,
    trace_id: Option<Uuid>,
    received_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<InboxRecord> for InboxMessage {
    type Error = ParseError;

    fn try_from(record: InboxRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            message_id: record.message_id,
            consumer: record.consumer,
            event_type: record.event_type,
            payload: record.payload,
            status: record.status.parse()?,
            attempts: record.attempts,
            last_error: record.last_error,
            correlation_id: record.correlation_id,
            trace_id: record.trace_id,
            received_at: record.received_at,
            processed_at: record.processed_at,
        })
    }
}

/// Inbox counters by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct InboxCounts {
    pub pending: i64,
    pub processed: i64,
    pub failed: i64,
}

#[async_trait]
pub trait InboxStore: Send + Sync {
    /// Store `message` unless its (message_id, consumer) pair already
    /// exists; returns the stored record either way
    async fn receive(&self, message: InboxMessage) -> Result<InboxMessage>;

    /// Persist status, attempts, error and trace of an existing record
    async fn save(&self, message: &InboxMessage) -> Result<()>;

    async fn counts(&self) -> Result<InboxCounts>;
}

#[derive(Clone)]
pub struct PgInboxStore {
    pool: PgPool,
}

impl PgInboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InboxStore for PgInboxStore {
    async fn receive(&self, message: InboxMessage) -> Result<InboxMessage> {
        sqlx::query(
            r#"
            INSERT INTO inbox_messages
                (id, message_id, consumer, event_type, payload, status, attempts,
                 correlation_id, trace_id, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9)
            ON CONFLICT (message_id, consumer) DO NOTHING
            "#,
        )
        .bind(message.id)
        .bind(message.message_id)
        .bind(&message.consumer)
        .bind(&message.event_type)
        .bind(&message.payload)
        .bind(InboxStatus::Pending.as_str())
        .bind(&message.correlation_id)
        .bind(message.trace_id)
        .bind(message.received_at)
        .execute(&self.pool)
        .await?;

        let record = sqlx::query_as::<_, InboxRecord>(
            r#"
            SELECT id, message_id, consumer, event_type, payload, status, attempts,
                   last_error, correlation_id, trace_id, received_at, processed_at
            FROM inbox_messages
            WHERE message_id = $1 AND consumer = $2
            "#,
        )
        .bind(message.message_id)
        .bind(&message.consumer)
        .fetch_one(&self.pool)
        .await?;

        Ok(InboxMessage::try_from(record)?)
    }

    async fn save(&self, message: &InboxMessage) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE inbox_messages
            SET status = $2, attempts = $3, last_error = $4, trace_id = $5, processed_at = $6
            WHERE id = $1 AND status <> 'processed'
            "#,
        )
        .bind(message.id)
        .bind(message.status.as_str())
        .bind(message.attempts)
        .bind(&message.last_error)
        .bind(message.trace_id)
        .bind(message.processed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn counts(&self) -> Result<InboxCounts> {
        let counts = sqlx::query_as::<_, InboxCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'processed') AS processed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed
            FROM inbox_messages
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
