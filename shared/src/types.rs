//! API request and response types

use crate::health_metrics::BmiCategory;
use crate::ids::{ExerciseId, UserId};
use crate::models::{ActivityLevel, BiologicalSex, Difficulty, FitnessGoal, MuscleGroup, UserRole};
use crate::units::{HeightUnit, WeightUnit};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size for list endpoints
pub const DEFAULT_TAKE: i64 = 20;
/// Largest page size a client may request
pub const MAX_TAKE: i64 = 100;

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub skip: i64,
    pub take: i64,
    pub has_more: bool,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_count: i64, skip: i64, take: i64) -> Self {
        let has_more = skip + (items.len() as i64) < total_count;
        Self {
            items,
            total_count,
            skip,
            take,
            has_more,
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// ============================================================================
// Identity
// ============================================================================

/// Authentication tokens response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// The authenticated account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityDto {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Users
// ============================================================================

/// User account as seen by the Users module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfileDto {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biological_sex: Option<BiologicalSex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    pub activity_level: ActivityLevel,
    pub fitness_goal: FitnessGoal,
    pub updated_at: DateTime<Utc>,
}

/// Profile update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub biological_sex: Option<BiologicalSex>,
    /// Height in `height_unit` (defaults to cm)
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub height_unit: Option<HeightUnit>,
    #[serde(default)]
    pub activity_level: Option<ActivityLevel>,
    #[serde(default)]
    pub fitness_goal: Option<FitnessGoal>,
}

/// A body measurement entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMetricDto {
    pub id: Uuid,
    pub user_id: UserId,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_mass_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_heart_rate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi_category: Option<BmiCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request to record a body measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetricRequest {
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
    /// Weight in `weight_unit` (defaults to kg)
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub weight_unit: Option<WeightUnit>,
    /// Height in `height_unit` (defaults to cm)
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub height_unit: Option<HeightUnit>,
    #[serde(default)]
    pub body_fat_percent: Option<f64>,
    #[serde(default)]
    pub muscle_mass_kg: Option<f64>,
    #[serde(default)]
    pub resting_heart_rate: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query string for the metrics history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsHistoryParams {
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

// ============================================================================
// Exercises
// ============================================================================

/// Exercise as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDto {
    pub id: ExerciseId,
    /// Owner of a custom exercise; `None` for built-in exercises
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub muscle_groups: Vec<MuscleGroup>,
    pub equipment: Vec<String>,
    pub instructions: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub is_custom: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of create and update exercise requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub muscle_groups: Vec<MuscleGroup>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Query string for the exercise list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExerciseListParams {
    pub muscle_group: Option<MuscleGroup>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

/// A muscle group with the number of exercises visible to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleGroupDto {
    pub name: MuscleGroup,
    pub display_name: String,
    pub exercise_count: i64,
}

// ============================================================================
// Messaging
// ============================================================================

/// Outbox and inbox counters for operators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagingStatsDto {
    pub outbox_pending: i64,
    pub outbox_processed: i64,
    /// Pending messages that reached the attempt limit
    pub outbox_exhausted: i64,
    pub inbox_pending: i64,
    pub inbox_processed: i64,
    pub inbox_failed: i64,
}
