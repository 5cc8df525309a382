//! Fitness Tracker Shared Library
//!
//! Contract types shared by the backend modules and API clients: DTOs,
//! identifiers, domain enumerations, unit conversions and validators.

pub mod errors;
pub mod health_metrics;
pub mod ids;
pub mod models;
pub mod types;
pub mod units;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use ids::{ExerciseId, UserId};
pub use models::{ActivityLevel, BiologicalSex, Difficulty, FitnessGoal, MuscleGroup, UserRole};
pub use types::*;
pub use units::{HeightUnit, WeightUnit};
