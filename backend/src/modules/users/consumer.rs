//! Builds Users records from Identity registrations

use super::repository::UserRepository;
use crate::messaging::events::UserRegistered;
use crate::messaging::IntegrationEventHandler;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

pub struct UserRegisteredConsumer {
    pool: PgPool,
}

impl UserRegisteredConsumer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationEventHandler<UserRegistered> for UserRegisteredConsumer {
    const NAME: &'static str = "users.user_registered";

    async fn handle(&self, event: UserRegistered) -> Result<()> {
        // `role` is stored as of registration; reads derive it from admin settings
        let created = UserRepository::create_if_absent(
            &self.pool,
            event.user_id.as_uuid(),
            &event.email,
            &event.display_name,
            event.role.as_str(),
        )
        .await?;

        if created {
            info!(user_id = %event.user_id, "User created from registration");
        } else {
            debug!(user_id = %event.user_id, "User already exists");
        }
        Ok(())
    }
}
