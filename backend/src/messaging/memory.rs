//! In-memory stores for unit tests

use super::inbox::{InboxCounts, InboxMessage, InboxStatus, InboxStore};
use super::outbox::{OutboxCounts, OutboxMessage, OutboxStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
pub(crate) struct InMemoryOutboxStore {
    messages: Mutex<Vec<OutboxMessage>>,
    not_before: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl InMemoryOutboxStore {
    pub(crate) fn push(&self, message: OutboxMessage) {
        self.messages.lock().unwrap().push(message);
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<OutboxMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// Make a backed-off message eligible again
    pub(crate) fn release(&self, id: Uuid) {
        self.not_before.lock().unwrap().remove(&id);
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn fetch_pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<OutboxMessage>> {
        let now = Utc::now();
        let messages = self.messages.lock().unwrap();
        let not_before = self.not_before.lock().unwrap();
        let mut pending: Vec<_> = messages
            .iter()
            .filter(|m| m.is_deliverable(max_attempts))
            .filter(|m| not_before.get(&m.id).map_or(true, |at| *at <= now))
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.created_at);
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    async fn mark_processed(&self, id: Uuid) -> Result<bool> {
        let mut messages = self.messages.lock().unwrap();
        match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => Ok(message.mark_processed(Utc::now()).is_ok()),
            None => Ok(false),
        }
    }

    async fn record_failure(&self, id: Uuid, error: &str, retry_after: Duration) -> Result<()> {
        let mut messages = self.messages.lock().unwrap();
        if let Some(message) = messages.iter_mut().find(|m| m.id == id && !m.is_processed) {
            message.record_failure(error);
            let delay = chrono::Duration::from_std(retry_after)?;
            self.not_before.lock().unwrap().insert(id, Utc::now() + delay);
        }
        Ok(())
    }

    async fn counts(&self, max_attempts: i32) -> Result<OutboxCounts> {
        let messages = self.messages.lock().unwrap();
        let mut counts = OutboxCounts::default();
        for message in messages.iter() {
            if message.is_processed {
                counts.processed += 1;
            } else if message.attempts < max_attempts {
                counts.pending += 1;
            } else {
                counts.exhausted += 1;
            }
        }
        Ok(counts)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryInboxStore {
    records: Mutex<HashMap<(Uuid, String), InboxMessage>>,
}

impl InMemoryInboxStore {
    pub(crate) fn get(&self, message_id: Uuid, consumer: &str) -> Option<InboxMessage> {
        self.records
            .lock()
            .unwrap()
            .get(&(message_id, consumer.to_string()))
            .cloned()
    }
}

#[async_trait]
impl InboxStore for InMemoryInboxStore {
    async fn receive(&self, message: InboxMessage) -> Result<InboxMessage> {
        let mut records = self.records.lock().unwrap();
        let stored = records
            .entry((message.message_id, message.consumer.clone()))
            .or_insert(message);
        Ok(stored.clone())
    }

    async fn save(&self, message: &InboxMessage) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get_mut(&(message.message_id, message.consumer.clone())) {
            if existing.status != InboxStatus::Processed {
                *existing = message.clone();
            }
        }
        Ok(())
    }

    async fn counts(&self) -> Result<InboxCounts> {
        let records = self.records.lock().unwrap();
        let mut counts = InboxCounts::default();
        for record in records.values() {
            match record.status {
                InboxStatus::Pending => counts.pending += 1,
                InboxStatus::Processed => counts.processed += 1,
                InboxStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}
