//! Operator view of the outbox and inbox

use super::inbox::InboxStore;
use super::outbox::OutboxStore;
use crate::error::ApiResult;
use crate::mediator::{Request, RequestHandler};
use async_trait::async_trait;
use fitness_tracker_shared::MessagingStatsDto;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Clone, Default)]
pub struct GetMessagingStatsQuery;

impl Validate for GetMessagingStatsQuery {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Request for GetMessagingStatsQuery {
    const NAME: &'static str = "GetMessagingStatsQuery";
    type Response = MessagingStatsDto;
}

pub struct GetMessagingStatsHandler {
    outbox: Arc<dyn OutboxStore>,
    inbox: Arc<dyn InboxStore>,
    max_attempts: i32,
}

impl GetMessagingStatsHandler {
    pub fn new(outbox: Arc<dyn OutboxStore>, inbox: Arc<dyn InboxStore>, max_attempts: i32) -> Self {
        Self {
            outbox,
            inbox,
            max_attempts,
        }
    }
}

#[async_trait]
impl RequestHandler<GetMessagingStatsQuery> for GetMessagingStatsHandler {
    async fn handle(&self, _query: GetMessagingStatsQuery) -> ApiResult<MessagingStatsDto> {
        let outbox = self.outbox.counts(self.max_attempts).await?;
        let inbox = self.inbox.counts().await?;

        Ok(MessagingStatsDto {
            outbox_pending: outbox.pending,
            outbox_processed: outbox.processed,
            outbox_exhausted: outbox.exhausted,
            inbox_pending: inbox.pending,
            inbox_processed: inbox.processed,
            inbox_failed: inbox.failed,
        })
    }
}
