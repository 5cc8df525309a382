//! Exercises request handlers

use super::commands::{
    CreateExerciseCommand, DeleteExerciseCommand, GetAllMuscleGroupsQuery, GetExerciseByIdQuery,
    GetExercisesQuery, UpdateExerciseCommand,
};
use super::repository::{ExerciseFields, ExerciseFilter, ExerciseRecord, ExerciseRepository};
use crate::error::{ApiError, ApiResult};
use crate::mediator::RequestHandler;
use crate::messaging::events::{ExerciseCreated, ExerciseDeleted};
use crate::messaging::{OutboxMessage, PgOutboxStore};
use async_trait::async_trait;
use chrono::Utc;
use fitness_tracker_shared::{
    Difficulty, ExerciseDto, ExerciseId, MuscleGroup, MuscleGroupDto, PagedResult, UserId,
};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;

/// Handles every Exercises request
#[derive(Clone)]
pub struct ExercisesHandler {
    pool: PgPool,
}

impl ExercisesHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load an exercise `viewer` is allowed to see
    async fn visible(&self, id: ExerciseId, viewer: UserId) -> ApiResult<ExerciseRecord> {
        ExerciseRepository::find_by_id(&self.pool, id.as_uuid())
            .await?
            .filter(|record| is_visible(record, viewer))
            .ok_or_else(|| ApiError::NotFound("Exercise not found".to_string()))
    }

    /// Load an exercise `user_id` may modify
    ///
    /// Unknown ids are NotFound; another user's exercise is Forbidden.
    async fn owned(&self, id: ExerciseId, user_id: UserId) -> ApiResult<ExerciseRecord> {
        let record = ExerciseRepository::find_by_id(&self.pool, id.as_uuid())
            .await?
            .ok_or_else(|| ApiError::NotFound("Exercise not found".to_string()))?;
        ensure_owner(&record, user_id)?;
        Ok(record)
    }

    async fn ensure_unique_name(
        &self,
        owner: UserId,
        name: &str,
        except: Option<ExerciseId>,
    ) -> ApiResult<()> {
        let taken = ExerciseRepository::name_taken(
            &self.pool,
            owner.as_uuid(),
            name,
            except.map(|id| id.as_uuid()),
        )
        .await?;

        if taken {
            return Err(ApiError::Conflict(format!(
                "You already have an exercise named '{}'",
                name
            )));
        }
        Ok(())
    }
}

fn is_visible(record: &ExerciseRecord, viewer: UserId) -> bool {
    record.user_id.map_or(true, |owner| owner == viewer.as_uuid())
}

/// Built-in exercises are read-only; custom ones belong to their owner
fn ensure_owner(record: &ExerciseRecord, user_id: UserId) -> ApiResult<()> {
    match record.user_id {
        None => Err(ApiError::Forbidden(
            "Built-in exercises cannot be modified".to_string(),
        )),
        Some(owner) if owner != user_id.as_uuid() => Err(ApiError::Forbidden(
            "You do not own this exercise".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

fn exercise_dto(record: ExerciseRecord) -> ApiResult<ExerciseDto> {
    let muscle_groups = record
        .muscle_groups
        .iter()
        .map(|group| group.parse::<MuscleGroup>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExerciseDto {
        id: ExerciseId::from(record.id),
        owner_id: record.user_id.map(UserId::from),
        is_custom: record.user_id.is_some(),
        name: record.name,
        description: record.description,
        muscle_groups,
        equipment: record.equipment,
        instructions: record.instructions,
        difficulty: record.difficulty.parse::<Difficulty>()?,
        video_url: record.video_url,
        image_url: record.image_url,
        tags: record.tags,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn to_strings(groups: &[MuscleGroup]) -> Vec<String> {
    groups.iter().map(|g| g.as_str().to_string()).collect()
}

/// Every muscle group in declaration order, zero when nothing targets it
fn muscle_group_dtos(counts: &HashMap<String, i64>) -> Vec<MuscleGroupDto> {
    MuscleGroup::ALL
        .iter()
        .map(|group| MuscleGroupDto {
            name: *group,
            display_name: group.display_name().to_string(),
            exercise_count: counts.get(group.as_str()).copied().unwrap_or(0),
        })
        .collect()
}

#[async_trait]
impl RequestHandler<CreateExerciseCommand> for ExercisesHandler {
    async fn handle(&self, cmd: CreateExerciseCommand) -> ApiResult<ExerciseDto> {
        self.ensure_unique_name(cmd.user_id, &cmd.name, None).await?;

        let id = ExerciseId::new();
        let fields = ExerciseFields {
            name: cmd.name,
            description: cmd.description,
            muscle_groups: to_strings(&cmd.muscle_groups),
            equipment: cmd.equipment,
            instructions: cmd.instructions,
            difficulty: cmd.difficulty.as_str().to_string(),
            video_url: cmd.video_url,
            image_url: cmd.image_url,
            tags: cmd.tags,
        };

        let mut tx = self.pool.begin().await?;
        let record =
            ExerciseRepository::insert(&mut *tx, id.as_uuid(), cmd.user_id.as_uuid(), &fields)
                .await?;

        let event = ExerciseCreated {
            exercise_id: id,
            owner_id: cmd.user_id,
            name: record.name.clone(),
            muscle_groups: cmd.muscle_groups,
            occurred_at: Utc::now(),
        };
        let message = OutboxMessage::create(&event).map_err(|e| ApiError::Internal(e.into()))?;
        PgOutboxStore::insert(&mut *tx, &message).await?;
        tx.commit().await?;

        info!(exercise_id = %id, user_id = %cmd.user_id, "Exercise created");
        exercise_dto(record)
    }
}

#[async_trait]
impl RequestHandler<UpdateExerciseCommand> for ExercisesHandler {
    async fn handle(&self, cmd: UpdateExerciseCommand) -> ApiResult<ExerciseDto> {
        self.owned(cmd.exercise_id, cmd.user_id).await?;
        self.ensure_unique_name(cmd.user_id, &cmd.name, Some(cmd.exercise_id))
            .await?;

        let fields = ExerciseFields {
            name: cmd.name,
            description: cmd.description,
            muscle_groups: to_strings(&cmd.muscle_groups),
            equipment: cmd.equipment,
            instructions: cmd.instructions,
            difficulty: cmd.difficulty.as_str().to_string(),
            video_url: cmd.video_url,
            image_url: cmd.image_url,
            tags: cmd.tags,
        };

        let record = ExerciseRepository::update(&self.pool, cmd.exercise_id.as_uuid(), &fields)
            .await?
            .ok_or_else(|| ApiError::NotFound("Exercise not found".to_string()))?;

        exercise_dto(record)
    }
}

#[async_trait]
impl RequestHandler<DeleteExerciseCommand> for ExercisesHandler {
    async fn handle(&self, cmd: DeleteExerciseCommand) -> ApiResult<()> {
        self.owned(cmd.exercise_id, cmd.user_id).await?;

        let mut tx = self.pool.begin().await?;
        let deleted =
            ExerciseRepository::delete(&mut *tx, cmd.exercise_id.as_uuid(), cmd.user_id.as_uuid())
                .await?;
        if !deleted {
            // Removed concurrently
            return Err(ApiError::NotFound("Exercise not found".to_string()));
        }

        let event = ExerciseDeleted {
            exercise_id: cmd.exercise_id,
            owner_id: cmd.user_id,
            occurred_at: Utc::now(),
        };
        let message = OutboxMessage::create(&event).map_err(|e| ApiError::Internal(e.into()))?;
        PgOutboxStore::insert(&mut *tx, &message).await?;
        tx.commit().await?;

        info!(exercise_id = %cmd.exercise_id, user_id = %cmd.user_id, "Exercise deleted");
        Ok(())
    }
}

#[async_trait]
impl RequestHandler<GetExerciseByIdQuery> for ExercisesHandler {
    async fn handle(&self, query: GetExerciseByIdQuery) -> ApiResult<ExerciseDto> {
        exercise_dto(self.visible(query.exercise_id, query.user_id).await?)
    }
}

#[async_trait]
impl RequestHandler<GetExercisesQuery> for ExercisesHandler {
    async fn handle(&self, query: GetExercisesQuery) -> ApiResult<PagedResult<ExerciseDto>> {
        let filter = ExerciseFilter {
            muscle_group: query.muscle_group.map(|g| g.as_str().to_string()),
            difficulty: query.difficulty.map(|d| d.as_str().to_string()),
            search: query.search,
            skip: query.skip,
            take: query.take,
        };
        let (records, total) =
            ExerciseRepository::list(&self.pool, query.user_id.as_uuid(), &filter).await?;

        let items = records
            .into_iter()
            .map(exercise_dto)
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(PagedResult::new(items, total, query.skip, query.take))
    }
}

#[async_trait]
impl RequestHandler<GetAllMuscleGroupsQuery> for ExercisesHandler {
    async fn handle(&self, query: GetAllMuscleGroupsQuery) -> ApiResult<Vec<MuscleGroupDto>> {
        let counts: HashMap<String, i64> =
            ExerciseRepository::muscle_group_counts(&self.pool, query.user_id.as_uuid())
                .await?
                .into_iter()
                .collect();

        Ok(muscle_group_dtos(&counts))
    }
}
