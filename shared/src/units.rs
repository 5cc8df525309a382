//! Unit conversion for body measurements
//!
//! Measurements are stored in SI units (kg, cm) and converted at the
//! API boundary.

use crate::errors::ParseError;
use serde::{Deserialize, Serialize};

const KG_PER_LB: f64 = 0.453592;
const CM_PER_INCH: f64 = 2.54;

/// Weight unit accepted on input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    /// Convert a value in this unit to kilograms
    pub fn to_kg(self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Lbs => value * KG_PER_LB,
        }
    }
}

impl std::str::FromStr for WeightUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kg" | "kilogram" | "kilograms" => Ok(WeightUnit::Kg),
            "lb" | "lbs" | "pound" | "pounds" => Ok(WeightUnit::Lbs),
            _ => Err(ParseError::Unit(s.to_string())),
        }
    }
}

/// Height unit accepted on input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    #[default]
    Cm,
    In,
}

impl HeightUnit {
    /// Convert a value in this unit to centimeters
    pub fn to_cm(self, value: f64) -> f64 {
        match self {
            HeightUnit::Cm => value,
            HeightUnit::In => value * CM_PER_INCH,
        }
    }
}

impl std::str::FromStr for HeightUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cm" | "centimeter" | "centimeters" => Ok(HeightUnit::Cm),
            "in" | "inch" | "inches" => Ok(HeightUnit::In),
            _ => Err(ParseError::Unit(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("kg", WeightUnit::Kg)]
    #[case("KG", WeightUnit::Kg)]
    #[case("lbs", WeightUnit::Lbs)]
    #[case("pound", WeightUnit::Lbs)]
    fn test_parse_weight_unit(#[case] input: &str, #[case] expected: WeightUnit) {
        assert_eq!(input.parse::<WeightUnit>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_unit_fails() {
        assert_eq!(
            "stone".parse::<WeightUnit>(),
            Err(ParseError::Unit("stone".to_string()))
        );
        assert!("ft".parse::<HeightUnit>().is_err());
    }

    #[test]
    fn test_known_conversions() {
        assert!((WeightUnit::Lbs.to_kg(165.0) - 74.84268).abs() < 1e-4);
        assert!((HeightUnit::In.to_cm(70.0) - 177.8).abs() < 1e-9);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_metric_units_pass_through(value in 0.0f64..500.0) {
            prop_assert_eq!(WeightUnit::Kg.to_kg(value), value);
            prop_assert_eq!(HeightUnit::Cm.to_cm(value), value);
        }

        #[test]
        fn prop_imperial_units_scale_linearly(value in 1.0f64..500.0) {
            prop_assert!((WeightUnit::Lbs.to_kg(value) / value - KG_PER_LB).abs() < 1e-12);
            prop_assert!((HeightUnit::In.to_cm(value) / value - CM_PER_INCH).abs() < 1e-12);
        }
    }
}
