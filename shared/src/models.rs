//! Domain enumerations for the Fitness Tracker application
//!
//! All of these are stored as lowercase snake_case strings and parse
//! strictly: unknown values are rejected rather than defaulted.

use crate::errors::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exercise difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(ParseError::Difficulty(s.to_string())),
        }
    }
}

/// Muscle group targeted by an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Forearms,
    Core,
    Glutes,
    Quadriceps,
    Hamstrings,
    Calves,
    FullBody,
    Cardio,
}

impl MuscleGroup {
    /// Every muscle group, in display order
    pub const ALL: [MuscleGroup; 13] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Shoulders,
        MuscleGroup::Biceps,
        MuscleGroup::Triceps,
        MuscleGroup::Forearms,
        MuscleGroup::Core,
        MuscleGroup::Glutes,
        MuscleGroup::Quadriceps,
        MuscleGroup::Hamstrings,
        MuscleGroup::Calves,
        MuscleGroup::FullBody,
        MuscleGroup::Cardio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Forearms => "forearms",
            MuscleGroup::Core => "core",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Quadriceps => "quadriceps",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Calves => "calves",
            MuscleGroup::FullBody => "full_body",
            MuscleGroup::Cardio => "cardio",
        }
    }

    /// Human readable name
    pub fn display_name(self) -> &'static str {
        match self {
            MuscleGroup::Chest => "Chest",
            MuscleGroup::Back => "Back",
            MuscleGroup::Shoulders => "Shoulders",
            MuscleGroup::Biceps => "Biceps",
            MuscleGroup::Triceps => "Triceps",
            MuscleGroup::Forearms => "Forearms",
            MuscleGroup::Core => "Core",
            MuscleGroup::Glutes => "Glutes",
            MuscleGroup::Quadriceps => "Quadriceps",
            MuscleGroup::Hamstrings => "Hamstrings",
            MuscleGroup::Calves => "Calves",
            MuscleGroup::FullBody => "Full Body",
            MuscleGroup::Cardio => "Cardio",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MuscleGroup {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        MuscleGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == normalized)
            .ok_or_else(|| ParseError::MuscleGroup(s.to_string()))
    }
}

/// Role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(ParseError::Role(s.to_string())),
        }
    }
}

/// Biological sex, used for health calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiologicalSex {
    Male,
    Female,
    Other,
}

impl BiologicalSex {
    pub fn as_str(self) -> &'static str {
        match self {
            BiologicalSex::Male => "male",
            BiologicalSex::Female => "female",
            BiologicalSex::Other => "other",
        }
    }
}

impl FromStr for BiologicalSex {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(BiologicalSex::Male),
            "female" | "f" => Ok(BiologicalSex::Female),
            "other" => Ok(BiologicalSex::Other),
            _ => Err(ParseError::Other {
                kind: "biological sex",
                value: s.to_string(),
            }),
        }
    }
}

/// Activity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    #[default]
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtremelyActive,
}

impl ActivityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::LightlyActive => "lightly_active",
            ActivityLevel::ModeratelyActive => "moderately_active",
            ActivityLevel::VeryActive => "very_active",
            ActivityLevel::ExtremelyActive => "extremely_active",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "lightly_active" => Ok(ActivityLevel::LightlyActive),
            "moderately_active" => Ok(ActivityLevel::ModeratelyActive),
            "very_active" => Ok(ActivityLevel::VeryActive),
            "extremely_active" => Ok(ActivityLevel::ExtremelyActive),
            _ => Err(ParseError::Other {
                kind: "activity level",
                value: s.to_string(),
            }),
        }
    }
}

/// Primary training goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    LoseWeight,
    BuildMuscle,
    ImproveEndurance,
    Maintain,
    #[default]
    GeneralFitness,
}

impl FitnessGoal {
    pub fn as_str(self) -> &'static str {
        match self {
            FitnessGoal::LoseWeight => "lose_weight",
            FitnessGoal::BuildMuscle => "build_muscle",
            FitnessGoal::ImproveEndurance => "improve_endurance",
            FitnessGoal::Maintain => "maintain",
            FitnessGoal::GeneralFitness => "general_fitness",
        }
    }
}

impl FromStr for FitnessGoal {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lose_weight" => Ok(FitnessGoal::LoseWeight),
            "build_muscle" => Ok(FitnessGoal::BuildMuscle),
            "improve_endurance" => Ok(FitnessGoal::ImproveEndurance),
            "maintain" => Ok(FitnessGoal::Maintain),
            "general_fitness" => Ok(FitnessGoal::GeneralFitness),
            _ => Err(ParseError::Other {
                kind: "fitness goal",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("full_body", MuscleGroup::FullBody)]
    #[case("Full Body", MuscleGroup::FullBody)]
    #[case("full-body", MuscleGroup::FullBody)]
    #[case("CHEST", MuscleGroup::Chest)]
    fn test_muscle_group_parsing_is_lenient_on_case(
        #[case] input: &str,
        #[case] expected: MuscleGroup,
    ) {
        assert_eq!(input.parse::<MuscleGroup>().unwrap(), expected);
    }

    #[test]
    fn test_every_muscle_group_round_trips_through_its_name() {
        for group in MuscleGroup::ALL {
            assert_eq!(group.as_str().parse::<MuscleGroup>().unwrap(), group);
            let json = serde_json::to_string(&group).unwrap();
            assert_eq!(json, format!("\"{}\"", group.as_str()));
        }
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        assert!("neck".parse::<MuscleGroup>().is_err());
        assert!("expert".parse::<Difficulty>().is_err());
        assert!("superuser".parse::<UserRole>().is_err());
        assert!("couch".parse::<ActivityLevel>().is_err());
    }

    #[test]
    fn test_difficulty_serializes_lowercase() {
        let json = serde_json::to_string(&Difficulty::Intermediate).unwrap();
        assert_eq!(json, "\"intermediate\"");
    }
}
