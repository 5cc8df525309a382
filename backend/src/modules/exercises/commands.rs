//! Exercises commands and queries

use crate::mediator::Request;
use fitness_tracker_shared::validation::{validate_equipment, validate_instructions, validate_tags};
use fitness_tracker_shared::{
    Difficulty, ExerciseDto, ExerciseId, ExerciseListParams, ExerciseRequest, MuscleGroup,
    MuscleGroupDto, PagedResult, UserId, DEFAULT_TAKE,
};
use validator::Validate;

/// Create a custom exercise owned by `user_id`
#[derive(Debug, Clone, Validate)]
pub struct CreateExerciseCommand {
    pub user_id: UserId,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "at least one muscle group is required"))]
    pub muscle_groups: Vec<MuscleGroup>,
    #[validate(custom(function = "validate_equipment"))]
    pub equipment: Vec<String>,
    #[validate(custom(function = "validate_instructions"))]
    pub instructions: Vec<String>,
    pub difficulty: Difficulty,
    #[validate(url(message = "must be a valid URL"))]
    pub video_url: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,
}

impl Request for CreateExerciseCommand {
    const NAME: &'static str = "CreateExerciseCommand";
    type Response = ExerciseDto;
}

impl CreateExerciseCommand {
    pub fn new(user_id: UserId, req: ExerciseRequest) -> Self {
        let req = normalize(req);
        Self {
            user_id,
            name: req.name,
            description: req.description,
            muscle_groups: req.muscle_groups,
            equipment: req.equipment,
            instructions: req.instructions,
            difficulty: req.difficulty,
            video_url: req.video_url,
            image_url: req.image_url,
            tags: req.tags,
        }
    }
}

/// Replace every editable field of a custom exercise; owner only
#[derive(Debug, Clone, Validate)]
pub struct UpdateExerciseCommand {
    pub exercise_id: ExerciseId,
    pub user_id: UserId,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "at least one muscle group is required"))]
    pub muscle_groups: Vec<MuscleGroup>,
    #[validate(custom(function = "validate_equipment"))]
    pub equipment: Vec<String>,
    #[validate(custom(function = "validate_instructions"))]
    pub instructions: Vec<String>,
    pub difficulty: Difficulty,
    #[validate(url(message = "must be a valid URL"))]
    pub video_url: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,
}

impl Request for UpdateExerciseCommand {
    const NAME: &'static str = "UpdateExerciseCommand";
    type Response = ExerciseDto;
}

impl UpdateExerciseCommand {
    pub fn new(exercise_id: ExerciseId, user_id: UserId, req: ExerciseRequest) -> Self {
        let req = normalize(req);
        Self {
            exercise_id,
            user_id,
            name: req.name,
            description: req.description,
            muscle_groups: req.muscle_groups,
            equipment: req.equipment,
            instructions: req.instructions,
            difficulty: req.difficulty,
            video_url: req.video_url,
            image_url: req.image_url,
            tags: req.tags,
        }
    }
}

/// Trim text, drop blank optionals, dedup muscle groups and tags
fn normalize(mut req: ExerciseRequest) -> ExerciseRequest {
    fn blank_to_none(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    req.name = req.name.trim().to_string();
    req.description = blank_to_none(req.description);
    req.video_url = blank_to_none(req.video_url);
    req.image_url = blank_to_none(req.image_url);

    let mut seen = Vec::with_capacity(req.muscle_groups.len());
    req.muscle_groups.retain(|group| {
        let fresh = !seen.contains(group);
        seen.push(*group);
        fresh
    });

    req.tags = req.tags.iter().map(|t| t.trim().to_lowercase()).collect();
    let mut tags = Vec::with_capacity(req.tags.len());
    for tag in req.tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    req.tags = tags;

    req.equipment = req.equipment.into_iter().map(|e| e.trim().to_string()).collect();
    req.instructions = req.instructions.into_iter().map(|s| s.trim().to_string()).collect();
    req
}

#[derive(Debug, Clone, Validate)]
pub struct DeleteExerciseCommand {
    pub exercise_id: ExerciseId,
    pub user_id: UserId,
}

impl Request for DeleteExerciseCommand {
    const NAME: &'static str = "DeleteExerciseCommand";
    type Response = ();
}

#[derive(Debug, Clone, Validate)]
pub struct GetExerciseByIdQuery {
    pub exercise_id: ExerciseId,
    pub user_id: UserId,
}

impl Request for GetExerciseByIdQuery {
    const NAME: &'static str = "GetExerciseByIdQuery";
    type Response = ExerciseDto;
}

/// Visible exercises, filtered and paged
#[derive(Debug, Clone, Validate)]
pub struct GetExercisesQuery {
    pub user_id: UserId,
    pub muscle_group: Option<MuscleGroup>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub search: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub skip: i64,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub take: i64,
}

impl Request for GetExercisesQuery {
    const NAME: &'static str = "GetExercisesQuery";
    type Response = PagedResult<ExerciseDto>;
}

impl GetExercisesQuery {
    pub fn new(user_id: UserId, params: ExerciseListParams) -> Self {
        Self {
            user_id,
            muscle_group: params.muscle_group,
            difficulty: params.difficulty,
            search: params
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            skip: params.skip.unwrap_or(0),
            take: params.take.unwrap_or(DEFAULT_TAKE),
        }
    }
}

/// Every muscle group with the number of exercises `user_id` can see
#[derive(Debug, Clone, Validate)]
pub struct GetAllMuscleGroupsQuery {
    pub user_id: UserId,
}

impl Request for GetAllMuscleGroupsQuery {
    const NAME: &'static str = "GetAllMuscleGroupsQuery";
    type Response = Vec<MuscleGroupDto>;
}
