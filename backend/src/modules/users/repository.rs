//! Users module storage: `users`, `user_profiles`, `user_metrics`

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRecord {
    pub user_id: Uuid,
    pub display_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub biological_sex: Option<String>,
    pub height_cm: Option<Decimal>,
    pub activity_level: String,
    pub fitness_goal: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub weight_kg: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub body_fat_percent: Option<Decimal>,
    pub muscle_mass_kg: Option<Decimal>,
    pub resting_heart_rate: Option<i32>,
    pub bmi: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile changes; `None` leaves a column unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub biological_sex: Option<String>,
    pub height_cm: Option<Decimal>,
    pub activity_level: Option<String>,
    pub fitness_goal: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMetric {
    pub user_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub weight_kg: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub body_fat_percent: Option<Decimal>,
    pub muscle_mass_kg: Option<Decimal>,
    pub resting_heart_rate: Option<i32>,
    pub bmi: Option<Decimal>,
    pub notes: Option<String>,
}

/// Date window and page for the metrics history
#[derive(Debug, Clone, Copy)]
pub struct MetricsWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub skip: i64,
    pub take: i64,
}

const METRIC_COLUMNS: &str = "id, user_id, recorded_at, weight_kg, height_cm, body_fat_percent, \
     muscle_mass_kg, resting_heart_rate, bmi, notes, created_at";

pub struct UserRepository;

impl UserRepository {
    /// Create the user and an empty profile; existing rows are left alone
    ///
    /// Returns true when the user row was newly inserted.
    pub async fn create_if_absent(
        pool: &PgPool,
        id: Uuid,
        email: &str,
        display_name: &str,
        role: &str,
    ) -> Result<bool> {
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(display_name)
        .bind(role)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(display_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, display_name, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRecord>> {
        let profile = sqlx::query_as::<_, ProfileRecord>(
            r#"
            SELECT user_id, display_name, date_of_birth, biological_sex, height_cm,
                   activity_level, fitness_goal, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    /// Apply `changes` to the profile and mirror the display name on the user
    pub async fn update_profile(
        conn: &mut sqlx::PgConnection,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<ProfileRecord>> {
        let profile = sqlx::query_as::<_, ProfileRecord>(
            r#"
            UPDATE user_profiles SET
                display_name = COALESCE($2, display_name),
                date_of_birth = COALESCE($3, date_of_birth),
                biological_sex = COALESCE($4, biological_sex),
                height_cm = COALESCE($5, height_cm),
                activity_level = COALESCE($6, activity_level),
                fitness_goal = COALESCE($7, fitness_goal),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, display_name, date_of_birth, biological_sex, height_cm,
                      activity_level, fitness_goal, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&changes.display_name)
        .bind(changes.date_of_birth)
        .bind(&changes.biological_sex)
        .bind(changes.height_cm)
        .bind(&changes.activity_level)
        .bind(&changes.fitness_goal)
        .fetch_optional(&mut *conn)
        .await?;

        if profile.is_some() && changes.display_name.is_some() {
            sqlx::query("UPDATE users SET display_name = $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(&changes.display_name)
                .execute(&mut *conn)
                .await?;
        }

        Ok(profile)
    }

    pub async fn insert_metric<'e, E>(executor: E, metric: NewMetric) -> Result<MetricRecord>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO user_metrics
                (id, user_id, recorded_at, weight_kg, height_cm, body_fat_percent,
                 muscle_mass_kg, resting_heart_rate, bmi, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            METRIC_COLUMNS
        );

        let record = sqlx::query_as::<_, MetricRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(metric.user_id)
            .bind(metric.recorded_at)
            .bind(metric.weight_kg)
            .bind(metric.height_cm)
            .bind(metric.body_fat_percent)
            .bind(metric.muscle_mass_kg)
            .bind(metric.resting_heart_rate)
            .bind(metric.bmi)
            .bind(metric.notes)
            .fetch_one(executor)
            .await?;

        Ok(record)
    }

    pub async fn latest_metric(pool: &PgPool, user_id: Uuid) -> Result<Option<MetricRecord>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM user_metrics
            WHERE user_id = $1
            ORDER BY recorded_at DESC, created_at DESC
            LIMIT 1
            "#,
            METRIC_COLUMNS
        );

        let record = sqlx::query_as::<_, MetricRecord>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(record)
    }

    /// Newest first, with the total matching the window
    pub async fn list_metrics(
        pool: &PgPool,
        user_id: Uuid,
        window: MetricsWindow,
    ) -> Result<(Vec<MetricRecord>, i64)> {
        let sql = format!(
            r#"
            SELECT {}
            FROM user_metrics
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR recorded_at >= $2)
              AND ($3::timestamptz IS NULL OR recorded_at <= $3)
            ORDER BY recorded_at DESC, created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            METRIC_COLUMNS
        );

        let records = sqlx::query_as::<_, MetricRecord>(&sql)
            .bind(user_id)
            .bind(window.start)
            .bind(window.end)
            .bind(window.take)
            .bind(window.skip)
            .fetch_all(pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM user_metrics
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR recorded_at >= $2)
              AND ($3::timestamptz IS NULL OR recorded_at <= $3)
            "#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(pool)
        .await?;

        Ok((records, total))
    }
}
