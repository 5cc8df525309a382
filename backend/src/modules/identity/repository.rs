//! Credential storage

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdentityUserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct IdentityRepository;

impl IdentityRepository {
    /// Insert an account; `None` when the email is already taken
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<IdentityUserRecord>>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query_as::<_, IdentityUserRecord>(
            r#"
            INSERT INTO identity_users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .fetch_one(executor)
        .await;

        match result {
            Ok(record) => Ok(Some(record)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<IdentityUserRecord>> {
        let record = sqlx::query_as::<_, IdentityUserRecord>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM identity_users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<IdentityUserRecord>> {
        let record = sqlx::query_as::<_, IdentityUserRecord>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM identity_users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM identity_users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}
