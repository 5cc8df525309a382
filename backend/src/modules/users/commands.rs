//! Users commands and queries

use crate::mediator::Request;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use fitness_tracker_shared::validation::validate_date_of_birth;
use fitness_tracker_shared::{
    ActivityLevel, BiologicalSex, FitnessGoal, HeightUnit, MetricsHistoryParams, PagedResult,
    RecordMetricRequest, UpdateProfileRequest, UserDto, UserId, UserMetricDto, UserProfileDto,
    WeightUnit, DEFAULT_TAKE,
};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

/// Plausible human heights, in cm
pub const HEIGHT_RANGE_CM: (f64, f64) = (30.0, 300.0);
/// Plausible human weights, in kg
pub const WEIGHT_RANGE_KG: (f64, f64) = (1.0, 700.0);

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Load a user account
#[derive(Debug, Clone, Copy)]
pub struct GetUserByIdQuery(pub UserId);

impl Validate for GetUserByIdQuery {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Request for GetUserByIdQuery {
    const NAME: &'static str = "GetUserByIdQuery";
    type Response = UserDto;
}

#[derive(Debug, Clone, Validate)]
pub struct GetUserProfileQuery {
    pub user_id: UserId,
}

impl Request for GetUserProfileQuery {
    const NAME: &'static str = "GetUserProfileQuery";
    type Response = UserProfileDto;
}

#[derive(Debug, Clone, Validate)]
pub struct GetLatestUserMetricQuery {
    pub user_id: UserId,
}

impl Request for GetLatestUserMetricQuery {
    const NAME: &'static str = "GetLatestUserMetricQuery";
    type Response = UserMetricDto;
}

/// Metrics history, newest first
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_date_window"))]
pub struct GetUserMetricsQuery {
    pub user_id: UserId,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub skip: i64,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub take: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Request for GetUserMetricsQuery {
    const NAME: &'static str = "GetUserMetricsQuery";
    type Response = PagedResult<UserMetricDto>;
}

impl GetUserMetricsQuery {
    pub fn new(user_id: UserId, params: MetricsHistoryParams) -> Self {
        Self {
            user_id,
            skip: params.skip.unwrap_or(0),
            take: params.take.unwrap_or(DEFAULT_TAKE),
            start_date: params.start_date,
            end_date: params.end_date,
        }
    }
}

fn validate_date_window(query: &GetUserMetricsQuery) -> Result<(), ValidationError> {
    match (query.start_date, query.end_date) {
        (Some(start), Some(end)) if start > end => Err(error(
            "date_range",
            "start_date must not be after end_date",
        )),
        _ => Ok(()),
    }
}

/// Partial profile update; absent fields keep their value
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_profile_height"))]
pub struct UpdateUserProfileCommand {
    pub user_id: UserId,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub display_name: Option<String>,
    #[validate(custom(function = "validate_date_of_birth"))]
    pub date_of_birth: Option<NaiveDate>,
    pub biological_sex: Option<BiologicalSex>,
    pub height: Option<f64>,
    pub height_unit: HeightUnit,
    pub activity_level: Option<ActivityLevel>,
    pub fitness_goal: Option<FitnessGoal>,
}

impl Request for UpdateUserProfileCommand {
    const NAME: &'static str = "UpdateUserProfileCommand";
    type Response = UserProfileDto;
}

impl UpdateUserProfileCommand {
    pub fn new(user_id: UserId, req: UpdateProfileRequest) -> Self {
        Self {
            user_id,
            display_name: req.display_name.map(|name| name.trim().to_string()),
            date_of_birth: req.date_of_birth,
            biological_sex: req.biological_sex,
            height: req.height,
            height_unit: req.height_unit.unwrap_or_default(),
            activity_level: req.activity_level,
            fitness_goal: req.fitness_goal,
        }
    }

    pub fn height_cm(&self) -> Option<f64> {
        self.height.map(|h| self.height_unit.to_cm(h))
    }
}

fn check_height(height_cm: Option<f64>) -> Result<(), ValidationError> {
    match height_cm {
        Some(cm) if !(HEIGHT_RANGE_CM.0..=HEIGHT_RANGE_CM.1).contains(&cm) => Err(error(
            "height",
            "height must be between 30 and 300 cm",
        )),
        _ => Ok(()),
    }
}

fn validate_profile_height(cmd: &UpdateUserProfileCommand) -> Result<(), ValidationError> {
    check_height(cmd.height_cm())
}

/// Record a body measurement; weight and height may use imperial units
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_measurements"))]
pub struct RecordUserMetricCommand {
    pub user_id: UserId,
    pub recorded_at: DateTime<Utc>,
    pub weight: Option<f64>,
    pub weight_unit: WeightUnit,
    pub height: Option<f64>,
    pub height_unit: HeightUnit,
    #[validate(range(min = 0.0, max = 100.0, message = "must be between 0 and 100"))]
    pub body_fat_percent: Option<f64>,
    #[validate(range(min = 0.1, max = 500.0, message = "must be between 0.1 and 500 kg"))]
    pub muscle_mass_kg: Option<f64>,
    #[validate(range(min = 20, max = 250, message = "must be between 20 and 250 bpm"))]
    pub resting_heart_rate: Option<i32>,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub notes: Option<String>,
}

impl Request for RecordUserMetricCommand {
    const NAME: &'static str = "RecordUserMetricCommand";
    type Response = UserMetricDto;
}

impl RecordUserMetricCommand {
    pub fn new(user_id: UserId, req: RecordMetricRequest) -> Self {
        Self {
            user_id,
            recorded_at: req.recorded_at,
            weight: req.weight,
            weight_unit: req.weight_unit.unwrap_or_default(),
            height: req.height,
            height_unit: req.height_unit.unwrap_or_default(),
            body_fat_percent: req.body_fat_percent,
            muscle_mass_kg: req.muscle_mass_kg,
            resting_heart_rate: req.resting_heart_rate,
            notes: req.notes,
        }
    }

    pub fn weight_kg(&self) -> Option<f64> {
        self.weight.map(|w| self.weight_unit.to_kg(w))
    }

    pub fn height_cm(&self) -> Option<f64> {
        self.height.map(|h| self.height_unit.to_cm(h))
    }

    fn has_measurement(&self) -> bool {
        self.weight.is_some()
            || self.height.is_some()
            || self.body_fat_percent.is_some()
            || self.muscle_mass_kg.is_some()
            || self.resting_heart_rate.is_some()
    }
}

fn validate_measurements(cmd: &RecordUserMetricCommand) -> Result<(), ValidationError> {
    if !cmd.has_measurement() {
        return Err(error("empty", "at least one measurement is required"));
    }
    if let Some(kg) = cmd.weight_kg() {
        if !(WEIGHT_RANGE_KG.0..=WEIGHT_RANGE_KG.1).contains(&kg) {
            return Err(error("weight", "weight must be between 1 and 700 kg"));
        }
    }
    check_height(cmd.height_cm())?;
    // Small allowance for client clock skew
    if cmd.recorded_at > Utc::now() + Duration::minutes(5) {
        return Err(error("recorded_at", "recorded_at must not be in the future"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn metrics_query(take: i64, skip: i64) -> GetUserMetricsQuery {
        GetUserMetricsQuery::new(
            UserId::new(),
            MetricsHistoryParams {
                skip: Some(skip),
                take: Some(take),
                ..Default::default()
            },
        )
    }

    fn record(weight: Option<f64>, unit: WeightUnit) -> RecordUserMetricCommand {
        RecordUserMetricCommand {
            user_id: UserId::new(),
            recorded_at: Utc::now(),
            weight,
            weight_unit: unit,
            height: None,
            height_unit: HeightUnit::Cm,
            body_fat_percent: None,
            muscle_mass_kg: None,
            resting_heart_rate: None,
            notes: None,
        }
    }

    #[test]
    fn test_metrics_query_defaults() {
        let query = GetUserMetricsQuery::new(UserId::new(), MetricsHistoryParams::default());
        assert_eq!(query.skip, 0);
        assert_eq!(query.take, 20);
        assert!(query.validate().is_ok());
    }

    #[rstest]
    #[case(1, 0, true)]
    #[case(100, 0, true)]
    #[case(0, 0, false)]
    #[case(101, 0, false)]
    #[case(20, -1, false)]
    fn test_metrics_query_paging(#[case] take: i64, #[case] skip: i64, #[case] valid: bool) {
        assert_eq!(metrics_query(take, skip).validate().is_ok(), valid);
    }

    #[test]
    fn test_metrics_query_rejects_inverted_window() {
        let mut query = metrics_query(20, 0);
        query.start_date = Some(Utc::now());
        query.end_date = Some(Utc::now() - Duration::days(1));
        assert!(query.validate().is_err());

        query.end_date = query.start_date;
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_weight_in_pounds_is_converted() {
        let cmd = record(Some(176.37), WeightUnit::Lbs);
        let kg = cmd.weight_kg().unwrap();
        assert!((kg - 80.0).abs() < 0.01);
        assert!(cmd.validate().is_ok());
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some(0.5), false)]
    #[case(Some(701.0), false)]
    #[case(Some(72.5), true)]
    fn test_record_metric_requires_plausible_measurement(#[case] weight: Option<f64>, #[case] valid: bool) {
        assert_eq!(record(weight, WeightUnit::Kg).validate().is_ok(), valid);
    }

    #[test]
    fn test_future_measurement_rejected() {
        let mut cmd = record(Some(70.0), WeightUnit::Kg);
        cmd.recorded_at = Utc::now() + Duration::days(1);
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn test_profile_height_in_inches() {
        let cmd = UpdateUserProfileCommand::new(
            UserId::new(),
            UpdateProfileRequest {
                height: Some(70.0),
                height_unit: Some(HeightUnit::In),
                ..Default::default()
            },
        );
        assert!((cmd.height_cm().unwrap() - 177.8).abs() < 0.01);
        assert!(cmd.validate().is_ok());

        let tiny = UpdateUserProfileCommand::new(
            UserId::new(),
            UpdateProfileRequest {
                height: Some(5.0),
                ..Default::default()
            },
        );
        assert!(tiny.validate().is_err());
    }
}
