//! Users request handlers

use super::commands::{
    GetLatestUserMetricQuery, GetUserByIdQuery, GetUserMetricsQuery, GetUserProfileQuery,
    RecordUserMetricCommand, UpdateUserProfileCommand,
};
use super::repository::{
    MetricRecord, MetricsWindow, NewMetric, ProfileChanges, ProfileRecord, UserRecord,
    UserRepository,
};
use crate::config::AdminSettings;
use crate::db::{opt_to_decimal, opt_to_f64};
use crate::error::{ApiError, ApiResult};
use crate::mediator::RequestHandler;
use crate::messaging::events::UserProfileUpdated;
use crate::messaging::{OutboxMessage, PgOutboxStore};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use fitness_tracker_shared::health_metrics::{calculate_bmi, classify_bmi};
use fitness_tracker_shared::{
    BiologicalSex, PagedResult, UserDto, UserId, UserMetricDto, UserProfileDto, UserRole,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

/// Handles every Users request
#[derive(Clone)]
pub struct UsersHandler {
    pool: PgPool,
    admin: Arc<AdminSettings>,
}

impl UsersHandler {
    pub fn new(pool: PgPool, admin: Arc<AdminSettings>) -> Self {
        Self { pool, admin }
    }

    async fn load_profile(&self, user_id: UserId) -> ApiResult<ProfileRecord> {
        UserRepository::get_profile(&self.pool, user_id.as_uuid())
            .await?
            .ok_or_else(|| ApiError::NotFound("User profile not found".to_string()))
    }
}

/// Whole years between `dob` and `today`
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// The stored role is a registration snapshot; admin membership is read
/// from `admin` so it matches the role in issued tokens
fn user_dto(record: UserRecord, admin: &AdminSettings) -> ApiResult<UserDto> {
    // Corrupt rows are still rejected
    record.role.parse::<UserRole>()?;
    let role = if admin.is_admin(&record.email) {
        UserRole::Admin
    } else {
        UserRole::User
    };

    Ok(UserDto {
        id: UserId::from(record.id),
        role,
        email: record.email,
        display_name: record.display_name,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn profile_dto(record: ProfileRecord) -> ApiResult<UserProfileDto> {
    Ok(UserProfileDto {
        user_id: UserId::from(record.user_id),
        display_name: record.display_name,
        age_years: record
            .date_of_birth
            .and_then(|dob| age_on(dob, Utc::now().date_naive())),
        date_of_birth: record.date_of_birth,
        biological_sex: record.biological_sex.as_deref().map(str::parse::<BiologicalSex>).transpose()?,
        height_cm: opt_to_f64(record.height_cm),
        activity_level: record.activity_level.parse()?,
        fitness_goal: record.fitness_goal.parse()?,
        updated_at: record.updated_at,
    })
}

fn metric_dto(record: MetricRecord) -> UserMetricDto {
    let bmi = opt_to_f64(record.bmi);
    UserMetricDto {
        id: record.id,
        user_id: UserId::from(record.user_id),
        recorded_at: record.recorded_at,
        weight_kg: opt_to_f64(record.weight_kg),
        height_cm: opt_to_f64(record.height_cm),
        body_fat_percent: opt_to_f64(record.body_fat_percent),
        muscle_mass_kg: opt_to_f64(record.muscle_mass_kg),
        resting_heart_rate: record.resting_heart_rate,
        bmi,
        bmi_category: bmi.map(classify_bmi),
        notes: record.notes,
        created_at: record.created_at,
    }
}

#[async_trait]
impl RequestHandler<GetUserByIdQuery> for UsersHandler {
    async fn handle(&self, query: GetUserByIdQuery) -> ApiResult<UserDto> {
        let record = UserRepository::find_by_id(&self.pool, query.0.as_uuid())
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        user_dto(record, &self.admin)
    }
}

#[async_trait]
impl RequestHandler<GetUserProfileQuery> for UsersHandler {
    async fn handle(&self, query: GetUserProfileQuery) -> ApiResult<UserProfileDto> {
        profile_dto(self.load_profile(query.user_id).await?)
    }
}

#[async_trait]
impl RequestHandler<GetLatestUserMetricQuery> for UsersHandler {
    async fn handle(&self, query: GetLatestUserMetricQuery) -> ApiResult<UserMetricDto> {
        UserRepository::latest_metric(&self.pool, query.user_id.as_uuid())
            .await?
            .map(metric_dto)
            .ok_or_else(|| ApiError::NotFound("No metrics recorded".to_string()))
    }
}

#[async_trait]
impl RequestHandler<GetUserMetricsQuery> for UsersHandler {
    async fn handle(&self, query: GetUserMetricsQuery) -> ApiResult<PagedResult<UserMetricDto>> {
        let window = MetricsWindow {
            start: query.start_date,
            end: query.end_date,
            skip: query.skip,
            take: query.take,
        };
        let (records, total) =
            UserRepository::list_metrics(&self.pool, query.user_id.as_uuid(), window).await?;

        Ok(PagedResult::new(
            records.into_iter().map(metric_dto).collect(),
            total,
            query.skip,
            query.take,
        ))
    }
}

#[async_trait]
impl RequestHandler<UpdateUserProfileCommand> for UsersHandler {
    async fn handle(&self, cmd: UpdateUserProfileCommand) -> ApiResult<UserProfileDto> {
        let changes = ProfileChanges {
            display_name: cmd.display_name.clone(),
            date_of_birth: cmd.date_of_birth,
            biological_sex: cmd.biological_sex.map(|s| s.as_str().to_string()),
            height_cm: opt_to_decimal(cmd.height_cm(), 1),
            activity_level: cmd.activity_level.map(|a| a.as_str().to_string()),
            fitness_goal: cmd.fitness_goal.map(|g| g.as_str().to_string()),
        };

        let mut tx = self.pool.begin().await?;
        let record = UserRepository::update_profile(&mut tx, cmd.user_id.as_uuid(), changes)
            .await?
            .ok_or_else(|| ApiError::NotFound("User profile not found".to_string()))?;

        let event = UserProfileUpdated {
            user_id: cmd.user_id,
            display_name: record.display_name.clone(),
            occurred_at: Utc::now(),
        };
        let message = OutboxMessage::create(&event).map_err(|e| ApiError::Internal(e.into()))?;
        PgOutboxStore::insert(&mut *tx, &message).await?;
        tx.commit().await?;

        profile_dto(record)
    }
}

#[async_trait]
impl RequestHandler<RecordUserMetricCommand> for UsersHandler {
    async fn handle(&self, cmd: RecordUserMetricCommand) -> ApiResult<UserMetricDto> {
        let profile = self.load_profile(cmd.user_id).await?;

        let weight_kg = cmd.weight_kg();
        let height_cm = cmd.height_cm();
        // Without a height in this entry, BMI uses the profile height
        let bmi_height = height_cm.or_else(|| opt_to_f64(profile.height_cm));
        let bmi = weight_kg
            .zip(bmi_height)
            .and_then(|(weight, height)| calculate_bmi(weight, height));
        debug!(user_id = %cmd.user_id, ?bmi, "Recording metric");

        let record = UserRepository::insert_metric(
            &self.pool,
            NewMetric {
                user_id: cmd.user_id.as_uuid(),
                recorded_at: cmd.recorded_at,
                weight_kg: opt_to_decimal(weight_kg, 2),
                height_cm: opt_to_decimal(height_cm, 1),
                body_fat_percent: opt_to_decimal(cmd.body_fat_percent, 1),
                muscle_mass_kg: opt_to_decimal(cmd.muscle_mass_kg, 2),
                resting_heart_rate: cmd.resting_heart_rate,
                bmi: opt_to_decimal(bmi, 1),
                notes: cmd.notes,
            },
        )
        .await?;

        Ok(metric_dto(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fitness_tracker_shared::health_metrics::BmiCategory;
    use fitness_tracker_shared::{ActivityLevel, FitnessGoal};
    use rstest::rstest;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_age_before_and_after_birthday() {
        let dob = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), Some(33));
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), Some(34));
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(1980, 1, 1).unwrap()), None);
    }

    #[test]
    fn test_metric_dto_classifies_bmi() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap();
        let dto = metric_dto(MetricRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            recorded_at: now,
            weight_kg: Some(Decimal::new(8000, 2)),
            height_cm: None,
            body_fat_percent: None,
            muscle_mass_kg: None,
            resting_heart_rate: Some(58),
            bmi: Some(Decimal::new(247, 1)),
            notes: None,
            created_at: now,
        });
        assert_eq!(dto.weight_kg, Some(80.0));
        assert_eq!(dto.bmi, Some(24.7));
        assert_eq!(dto.bmi_category, Some(BmiCategory::Normal));
    }

    #[test]
    fn test_profile_dto_parses_stored_enums() {
        let dto = profile_dto(ProfileRecord {
            user_id: Uuid::new_v4(),
            display_name: "Ana".to_string(),
            date_of_birth: None,
            biological_sex: Some("female".to_string()),
            height_cm: Some(Decimal::new(1655, 1)),
            activity_level: "very_active".to_string(),
            fitness_goal: "build_muscle".to_string(),
            updated_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(dto.activity_level, ActivityLevel::VeryActive);
        assert_eq!(dto.fitness_goal, FitnessGoal::BuildMuscle);
        assert_eq!(dto.height_cm, Some(165.5));
        assert!(dto.age_years.is_none());
    }

    fn user_record(email: &str, role: &str) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: "Ana".to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn admins(emails: &[&str]) -> AdminSettings {
        AdminSettings {
            admin_emails: emails.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_corrupt_role_is_internal_error() {
        let result = user_dto(user_record("ana@example.com", "superuser"), &admins(&[]));
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[rstest]
    #[case::promoted_after_registration("user", &["ana@example.com"], UserRole::Admin)]
    #[case::demoted_after_registration("admin", &[], UserRole::User)]
    #[case::unchanged_admin("admin", &["ANA@example.com"], UserRole::Admin)]
    #[case::unchanged_user("user", &["coach@example.com"], UserRole::User)]
    fn test_role_follows_admin_settings(
        #[case] stored: &str,
        #[case] admin_emails: &[&str],
        #[case] expected: UserRole,
    ) {
        let dto = user_dto(user_record("ana@example.com", stored), &admins(admin_emails)).unwrap();
        assert_eq!(dto.role, expected);
    }
}
