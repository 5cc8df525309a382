//! Custom validators used by the `validator` derive on request types
//!
//! The declarative attributes (`length`, `range`, `url`, `email`) cover most
//! fields; these functions handle list contents and dates.

use std::borrow::Cow;
use std::sync::OnceLock;
use validator::ValidationError;

pub const MAX_TAGS: usize = 20;
pub const MAX_INSTRUCTION_STEPS: usize = 50;
pub const MAX_INSTRUCTION_LENGTH: usize = 500;
pub const MAX_EQUIPMENT_ITEMS: usize = 20;
pub const MAX_EQUIPMENT_LENGTH: usize = 50;

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn tag_regex() -> &'static regex_lite::Regex {
    static TAG: OnceLock<regex_lite::Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        regex_lite::Regex::new(r"^[a-z0-9][a-z0-9-]{0,29}$").expect("tag pattern is valid")
    })
}

/// Tags are lowercase slugs, at most 20 of them
pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(error("tags", format!("At most {} tags are allowed", MAX_TAGS)));
    }
    if let Some(bad) = tags.iter().find(|tag| !tag_regex().is_match(tag)) {
        return Err(error(
            "tags",
            format!("Invalid tag '{}': use lowercase letters, digits and dashes", bad),
        ));
    }
    Ok(())
}

/// Instructions are an ordered list of non-empty steps
pub fn validate_instructions(steps: &[String]) -> Result<(), ValidationError> {
    if steps.len() > MAX_INSTRUCTION_STEPS {
        return Err(error(
            "instructions",
            format!("At most {} instruction steps are allowed", MAX_INSTRUCTION_STEPS),
        ));
    }
    for step in steps {
        let step = step.trim();
        if step.is_empty() {
            return Err(error("instructions", "Instruction steps cannot be empty"));
        }
        if step.chars().count() > MAX_INSTRUCTION_LENGTH {
            return Err(error(
                "instructions",
                format!("Instruction steps must be at most {} characters", MAX_INSTRUCTION_LENGTH),
            ));
        }
    }
    Ok(())
}

/// Equipment is a short list of short names
pub fn validate_equipment(items: &[String]) -> Result<(), ValidationError> {
    if items.len() > MAX_EQUIPMENT_ITEMS {
        return Err(error(
            "equipment",
            format!("At most {} equipment items are allowed", MAX_EQUIPMENT_ITEMS),
        ));
    }
    if items
        .iter()
        .any(|item| item.trim().is_empty() || item.chars().count() > MAX_EQUIPMENT_LENGTH)
    {
        return Err(error(
            "equipment",
            format!("Equipment names must be 1-{} characters", MAX_EQUIPMENT_LENGTH),
        ));
    }
    Ok(())
}

/// Date of birth must be in the past and give an age of 1 to 120 years
pub fn validate_date_of_birth(dob: &chrono::NaiveDate) -> Result<(), ValidationError> {
    let today = chrono::Utc::now().date_naive();

    if *dob > today {
        return Err(error("date_of_birth", "Date of birth cannot be in the future"));
    }

    match today.years_since(*dob) {
        Some(age) if age < 1 => Err(error("date_of_birth", "Age must be at least 1 year")),
        Some(age) if age > 120 => Err(error("date_of_birth", "Age cannot exceed 120 years")),
        None => Err(error("date_of_birth", "Invalid date of birth")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rstest::rstest;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&["strength", "push-day", "home"])]
    #[case(&[])]
    fn test_valid_tags(#[case] tags: &[&str]) {
        assert!(validate_tags(&strings(tags)).is_ok());
    }

    #[rstest]
    #[case(&["Strength"])]
    #[case(&["-leading-dash"])]
    #[case(&["has space"])]
    #[case(&[""])]
    fn test_invalid_tags(#[case] tags: &[&str]) {
        assert!(validate_tags(&strings(tags)).is_err());
    }

    #[test]
    fn test_too_many_tags() {
        let tags: Vec<String> = (0..=MAX_TAGS).map(|i| format!("tag{}", i)).collect();
        assert!(validate_tags(&tags).is_err());
    }

    #[test]
    fn test_instructions_reject_blank_steps() {
        assert!(validate_instructions(&strings(&["Lie on the bench", "  "])).is_err());
        assert!(validate_instructions(&strings(&["Lie on the bench", "Press up"])).is_ok());
    }

    #[test]
    fn test_equipment_limits() {
        assert!(validate_equipment(&strings(&["barbell", "bench"])).is_ok());
        assert!(validate_equipment(&strings(&[""])).is_err());
        assert!(validate_equipment(&["x".repeat(MAX_EQUIPMENT_LENGTH + 1)]).is_err());
    }

    #[test]
    fn test_date_of_birth() {
        let today = Utc::now().date_naive();
        assert!(validate_date_of_birth(&(today + Duration::days(1))).is_err());
        assert!(validate_date_of_birth(&today).is_err());
        assert!(validate_date_of_birth(&(today - Duration::days(365 * 30))).is_ok());
        assert!(validate_date_of_birth(&(today - Duration::days(365 * 130))).is_err());
    }
}
