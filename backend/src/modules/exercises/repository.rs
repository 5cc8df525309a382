//! Exercise storage
//!
//! Built-in exercises have a `NULL` owner and are visible to everyone;
//! custom exercises are visible to their owner only.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExerciseRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub muscle_groups: Vec<String>,
    pub equipment: Vec<String>,
    pub instructions: Vec<String>,
    pub difficulty: String,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable exercise columns
#[derive(Debug, Clone)]
pub struct ExerciseFields {
    pub name: String,
    pub description: Option<String>,
    pub muscle_groups: Vec<String>,
    pub equipment: Vec<String>,
    pub instructions: Vec<String>,
    pub difficulty: String,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseFilter {
    pub muscle_group: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
    pub skip: i64,
    pub take: i64,
}

const COLUMNS: &str = "id, user_id, name, description, muscle_groups, equipment, instructions, \
     difficulty, video_url, image_url, tags, created_at, updated_at";

const VISIBLE_TO: &str = "(user_id IS NULL OR user_id = $1)";

/// `%term%` with LIKE metacharacters escaped
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct ExerciseRepository;

impl ExerciseRepository {
    pub async fn insert<'e, E>(
        executor: E,
        id: Uuid,
        owner: Uuid,
        fields: &ExerciseFields,
    ) -> Result<ExerciseRecord>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO exercises
                (id, user_id, name, description, muscle_groups, equipment, instructions,
                 difficulty, video_url, image_url, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            COLUMNS
        );

        let record = sqlx::query_as::<_, ExerciseRecord>(&sql)
            .bind(id)
            .bind(owner)
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(&fields.muscle_groups)
            .bind(&fields.equipment)
            .bind(&fields.instructions)
            .bind(&fields.difficulty)
            .bind(&fields.video_url)
            .bind(&fields.image_url)
            .bind(&fields.tags)
            .fetch_one(executor)
            .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ExerciseRecord>> {
        let sql = format!("SELECT {} FROM exercises WHERE id = $1", COLUMNS);
        let record = sqlx::query_as::<_, ExerciseRecord>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(record)
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        fields: &ExerciseFields,
    ) -> Result<Option<ExerciseRecord>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            UPDATE exercises SET
                name = $2, description = $3, muscle_groups = $4, equipment = $5,
                instructions = $6, difficulty = $7, video_url = $8, image_url = $9,
                tags = $10, updated_at = NOW()
            WHERE id = $1 AND user_id IS NOT NULL
            RETURNING {}
            "#,
            COLUMNS
        );

        let record = sqlx::query_as::<_, ExerciseRecord>(&sql)
            .bind(id)
            .bind(&fields.name)
            .bind(&fields.description)
            .bind(&fields.muscle_groups)
            .bind(&fields.equipment)
            .bind(&fields.instructions)
            .bind(&fields.difficulty)
            .bind(&fields.video_url)
            .bind(&fields.image_url)
            .bind(&fields.tags)
            .fetch_optional(executor)
            .await?;

        Ok(record)
    }

    /// Delete a custom exercise owned by `owner`
    pub async fn delete<'e, E>(executor: E, id: Uuid, owner: Uuid) -> Result<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM exercises WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// True when `owner` already has a custom exercise called `name`
    pub async fn name_taken(
        pool: &PgPool,
        owner: Uuid,
        name: &str,
        except: Option<Uuid>,
    ) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM exercises
                WHERE user_id = $1
                  AND LOWER(name) = LOWER($2)
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(owner)
        .bind(name)
        .bind(except)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    /// Exercises visible to `viewer`, ordered by name, with the total count
    pub async fn list(
        pool: &PgPool,
        viewer: Uuid,
        filter: &ExerciseFilter,
    ) -> Result<(Vec<ExerciseRecord>, i64)> {
        let conditions = format!(
            r#"
            {}
              AND ($2::text IS NULL OR $2 = ANY(muscle_groups))
              AND ($3::text IS NULL OR difficulty = $3)
              AND ($4::text IS NULL OR name ILIKE $4 OR description ILIKE $4)
            "#,
            VISIBLE_TO
        );
        let pattern = filter.search.as_deref().map(like_pattern);

        let sql = format!(
            "SELECT {} FROM exercises WHERE {} ORDER BY LOWER(name) ASC, id ASC LIMIT $5 OFFSET $6",
            COLUMNS, conditions
        );
        let records = sqlx::query_as::<_, ExerciseRecord>(&sql)
            .bind(viewer)
            .bind(&filter.muscle_group)
            .bind(&filter.difficulty)
            .bind(&pattern)
            .bind(filter.take)
            .bind(filter.skip)
            .fetch_all(pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM exercises WHERE {}", conditions);
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(viewer)
            .bind(&filter.muscle_group)
            .bind(&filter.difficulty)
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

        Ok((records, total))
    }

    /// Number of visible exercises per stored muscle group name
    pub async fn muscle_group_counts(pool: &PgPool, viewer: Uuid) -> Result<Vec<(String, i64)>> {
        let sql = format!(
            r#"
            SELECT mg, COUNT(*)
            FROM exercises, unnest(muscle_groups) AS mg
            WHERE {}
            GROUP BY mg
            "#,
            VISIBLE_TO
        );

        let counts = sqlx::query_as::<_, (String, i64)>(&sql)
            .bind(viewer)
            .fetch_all(pool)
            .await?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("press", "%press%")]
    #[case("100%", "%100\\%%")]
    #[case("push_up", "%push\\_up%")]
    #[case("a\\b", "%a\\\\b%")]
    fn test_like_pattern_escapes(#[case] term: &str, #[case] expected: &str) {
        assert_eq!(like_pattern(term), expected);
    }
}
