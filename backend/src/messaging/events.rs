//! Integration events exchanged between modules
//!
//! Events are serialized into the outbox by the producing module and
//! delivered to consumers of other modules by the relay.

use chrono::{DateTime, Utc};
use fitness_tracker_shared::{ExerciseId, MuscleGroup, UserId, UserRole};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// An event published across module boundaries
pub trait IntegrationEvent: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable type name stored in `outbox_messages.event_type`
    const EVENT_TYPE: &'static str;

    /// Id of the aggregate the event is about
    fn correlation_id(&self) -> String;
}

/// An account was created by the Identity module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub occurred_at: DateTime<Utc>,
}

impl IntegrationEvent for UserRegistered {
    const EVENT_TYPE: &'static str = "UserRegistered";

    fn correlation_id(&self) -> String {
        self.user_id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfileUpdated {
    pub user_id: UserId,
    pub display_name: String,
    pub occurred_at: DateTime<Utc>,
}

impl IntegrationEvent for UserProfileUpdated {
    const EVENT_TYPE: &'static str = "UserProfileUpdated";

    fn correlation_id(&self) -> String {
        self.user_id.to_string()
    }
}

/// A user created a custom exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseCreated {
    pub exercise_id: ExerciseId,
    pub owner_id: UserId,
    pub name: String,
    pub muscle_groups: Vec<MuscleGroup>,
    pub occurred_at: DateTime<Utc>,
}

impl IntegrationEvent for ExerciseCreated {
    const EVENT_TYPE: &'static str = "ExerciseCreated";

    fn correlation_id(&self) -> String {
        self.exercise_id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDeleted {
    pub exercise_id: ExerciseId,
    pub owner_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl IntegrationEvent for ExerciseDeleted {
    const EVENT_TYPE: &'static str = "ExerciseDeleted";

    fn correlation_id(&self) -> String {
        self.exercise_id.to_string()
    }
}
