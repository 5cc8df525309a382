//! Outbox relay
//!
//! Background task that claims pending outbox messages, publishes them to
//! every configured bus and marks them processed.

use super::bus::EventBus;
use super::outbox::{OutboxMessage, OutboxStore};
use crate::config::OutboxSettings;
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OutboxRelayConfig {
    /// Messages claimed per pass
    pub batch_size: i64,
    /// Sleep between passes when the outbox is drained or a pass had failures
    pub poll_interval: Duration,
    /// Messages with this many failed attempts are no longer fetched
    pub max_attempts: i32,
    /// Delay before the first retry of a failed message
    pub retry_delay: Duration,
    /// Upper bound for the doubled retry delay
    pub max_retry_delay: Duration,
}

impl OutboxRelayConfig {
    /// Delay before the next attempt of a message that has failed `attempts` times
    pub fn retry_delay(&self, attempts: i32) -> Duration {
        let exponent = attempts.saturating_sub(1).clamp(0, 20) as u32;
        self.retry_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_retry_delay)
    }
}

impl Default for OutboxRelayConfig {
    fn default() -> Self {
        Self::from(&OutboxSettings::default())
    }
}

impl From<&OutboxSettings> for OutboxRelayConfig {
    fn from(settings: &OutboxSettings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_attempts: settings.max_attempts.max(1),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            max_retry_delay: Duration::from_millis(
                settings.max_retry_delay_ms.max(settings.retry_delay_ms),
            ),
        }
    }
}

/// Result of one relay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub published: usize,
    pub failed: usize,
}

pub struct OutboxRelay {
    store: Arc<dyn OutboxStore>,
    buses: Vec<Arc<dyn EventBus>>,
    config: OutboxRelayConfig,
}

impl OutboxRelay {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        buses: Vec<Arc<dyn EventBus>>,
        config: OutboxRelayConfig,
    ) -> Self {
        Self {
            store,
            buses,
            config,
        }
    }

    /// Publish one batch
    ///
    /// A message is marked processed only after every bus accepted it.
    /// Any failure increments its attempt counter instead.
    pub async fn process_batch(&self) -> Result<BatchReport> {
        let trace_id = Uuid::new_v4();
        let span = info_span!("outbox.relay", %trace_id);

        async move {
            let messages = self
                .store
                .fetch_pending(self.config.batch_size, self.config.max_attempts)
                .await?;

            let mut report = BatchReport {
                fetched: messages.len(),
                ..Default::default()
            };
            if messages.is_empty() {
                return Ok(report);
            }
            debug!(count = messages.len(), "Relaying outbox messages");

            for message in &messages {
                let started = Instant::now();
                match self.publish(message, trace_id).await {
                    Ok(()) => {
                        if !self.store.mark_processed(message.id).await? {
                            debug!(message_id = %message.id, "Message was already processed");
                        }
                        report.published += 1;
                        metrics::counter!("outbox_messages_published_total", "event_type" => message.event_type.clone())
                            .increment(1);
                        metrics::histogram!("outbox_publish_duration_seconds")
                            .record(started.elapsed().as_secs_f64());
                    }
                    Err(e) => {
                        let reason = format!("{:#}", e);
                        let attempts = message.attempts + 1;
                        let retry_after = self.config.retry_delay(attempts);
                        self.store
                            .record_failure(message.id, &reason, retry_after)
                            .await?;
                        report.failed += 1;
                        metrics::counter!("outbox_publish_failures_total", "event_type" => message.event_type.clone())
                            .increment(1);

                        if attempts >= self.config.max_attempts {
                            error!(
                                message_id = %message.id,
                                event_type = %message.event_type,
                                error = %reason,
                                "Outbox message exhausted its attempts"
                            );
                        } else {
                            warn!(
                                message_id = %message.id,
                                event_type = %message.event_type,
                                attempt = attempts,
                                retry_after_ms = retry_after.as_millis() as u64,
                                error = %reason,
                                "Outbox publish failed"
                            );
                        }
                    }
                }
            }

            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn publish(&self, message: &OutboxMessage, trace_id: Uuid) -> Result<()> {
        for bus in &self.buses {
            bus.publish(message, trace_id)
                .await
                .map_err(|e| e.context(format!("{} bus", bus.name())))?;
        }
        Ok(())
    }

    /// Poll until `shutdown` flips to true or its sender is dropped
    ///
    /// The next pass starts at once only after a full batch published
    /// cleanly. Otherwise the relay waits `poll_interval` first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            buses = ?self.buses.iter().map(|b| b.name()).collect::<Vec<_>>(),
            "Outbox relay started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.process_batch().await {
                Ok(report) => report.failed > 0 || (report.fetched as i64) < self.config.batch_size,
                Err(e) => {
                    error!(error = %e, "Outbox relay pass failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        info!("Outbox relay stopped");
    }
}
