//! Exercises module: the built-in catalogue plus user-defined exercises

mod commands;
mod handlers;
mod repository;
mod routes;

pub use commands::{
    CreateExerciseCommand, DeleteExerciseCommand, GetAllMuscleGroupsQuery, GetExerciseByIdQuery,
    GetExercisesQuery, UpdateExerciseCommand,
};
pub use handlers::ExercisesHandler;
pub use routes::exercises_routes;

use crate::mediator::MediatorBuilder;

pub fn register_handlers(builder: MediatorBuilder, handler: ExercisesHandler) -> MediatorBuilder {
    builder
        .register::<CreateExerciseCommand, _>(handler.clone())
        .register::<UpdateExerciseCommand, _>(handler.clone())
        .register::<DeleteExerciseCommand, _>(handler.clone())
        .register::<GetExerciseByIdQuery, _>(handler.clone())
        .register::<GetExercisesQuery, _>(handler.clone())
        .register::<GetAllMuscleGroupsQuery, _>(handler)
}
