//! Exercises routes
//!
//! GET    /api/v1/exercises
//! POST   /api/v1/exercises
//! GET    /api/v1/exercises/muscle-groups
//! GET    /api/v1/exercises/:id
//! PUT    /api/v1/exercises/:id
//! DELETE /api/v1/exercises/:id

use super::commands::{
    CreateExerciseCommand, DeleteExerciseCommand, GetAllMuscleGroupsQuery, GetExerciseByIdQuery,
    GetExercisesQuery, UpdateExerciseCommand,
};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use fitness_tracker_shared::{
    ExerciseDto, ExerciseId, ExerciseListParams, ExerciseRequest, MuscleGroupDto, PagedResult,
};

pub fn exercises_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exercises).post(create_exercise))
        .route("/muscle-groups", get(muscle_groups))
        .route(
            "/:id",
            get(get_exercise).put(update_exercise).delete(delete_exercise),
        )
}

async fn list_exercises(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<ExerciseListParams>,
) -> ApiResult<Json<PagedResult<ExerciseDto>>> {
    let page = state
        .mediator()
        .send(GetExercisesQuery::new(auth_user.user_id, params))
        .await?;
    Ok(Json(page))
}

async fn create_exercise(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<ExerciseRequest>,
) -> ApiResult<(StatusCode, Json<ExerciseDto>)> {
    let exercise = state
        .mediator()
        .send(CreateExerciseCommand::new(auth_user.user_id, req))
        .await?;
    Ok((StatusCode::CREATED, Json(exercise)))
}

async fn muscle_groups(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<Vec<MuscleGroupDto>>> {
    let groups = state
        .mediator()
        .send(GetAllMuscleGroupsQuery {
            user_id: auth_user.user_id,
        })
        .await?;
    Ok(Json(groups))
}

async fn get_exercise(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ExerciseId>,
) -> ApiResult<Json<ExerciseDto>> {
    let exercise = state
        .mediator()
        .send(GetExerciseByIdQuery {
            exercise_id: id,
            user_id: auth_user.user_id,
        })
        .await?;
    Ok(Json(exercise))
}

async fn update_exercise(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ExerciseId>,
    Json(req): Json<ExerciseRequest>,
) -> ApiResult<Json<ExerciseDto>> {
    let exercise = state
        .mediator()
        .send(UpdateExerciseCommand::new(id, auth_user.user_id, req))
        .await?;
    Ok(Json(exercise))
}

async fn delete_exercise(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ExerciseId>,
) -> ApiResult<StatusCode> {
    state
        .mediator()
        .send(DeleteExerciseCommand {
            exercise_id: id,
            user_id: auth_user.user_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
