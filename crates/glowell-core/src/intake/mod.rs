//! Intake profile: the normalized user input that drives plan generation.
//!
//! Raw form data is coerced into an [`Intake`] by [`normalize`] (which never
//! fails) and then checked by [`validate`], which reports every problem as a
//! [`ValidationIssue`].

pub mod normalize;
pub mod validate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use normalize::{DEFAULT_SLEEP_TIME, DEFAULT_WAKE_TIME, normalize};
pub use validate::{ValidationIssue, validate};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Supported output locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Hi,
    Mr,
    Ta,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Mr => "mr",
            Self::Ta => "ta",
        };
        f.write_str(s)
    }
}

impl FromStr for Locale {
    type Err = LocaleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "hi" => Ok(Self::Hi),
            "mr" => Ok(Self::Mr),
            "ta" => Ok(Self::Ta),
            other => Err(LocaleParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an unsupported [`Locale`] string.
#[derive(Debug, Clone)]
pub struct LocaleParseError(pub String);

impl fmt::Display for LocaleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported locale: {:?}", self.0)
    }
}

impl std::error::Error for LocaleParseError {}

// ---------------------------------------------------------------------------

/// Constitution tag used purely as a lookup key for fragment tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dosha {
    Vata,
    Pitta,
    Kapha,
    Mixed,
}

impl fmt::Display for Dosha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vata => "vata",
            Self::Pitta => "pitta",
            Self::Kapha => "kapha",
            Self::Mixed => "mixed",
        };
        f.write_str(s)
    }
}

impl FromStr for Dosha {
    type Err = DoshaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vata" => Ok(Self::Vata),
            "pitta" => Ok(Self::Pitta),
            "kapha" => Ok(Self::Kapha),
            "mixed" | "tridosha" => Ok(Self::Mixed),
            other => Err(DoshaParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Dosha`] string.
#[derive(Debug, Clone)]
pub struct DoshaParseError(pub String);

impl fmt::Display for DoshaParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid dosha: {:?}", self.0)
    }
}

impl std::error::Error for DoshaParseError {}

// ---------------------------------------------------------------------------

/// The user's primary wellness goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    WeightLoss,
    EnergyBoost,
    MentalPeace,
    BetterSleep,
    Digestion,
    Immunity,
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WeightLoss => "weight-loss",
            Self::EnergyBoost => "energy-boost",
            Self::MentalPeace => "mental-peace",
            Self::BetterSleep => "better-sleep",
            Self::Digestion => "digestion",
            Self::Immunity => "immunity",
        };
        f.write_str(s)
    }
}

impl FromStr for Goal {
    type Err = GoalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weight-loss" => Ok(Self::WeightLoss),
            "energy-boost" => Ok(Self::EnergyBoost),
            "mental-peace" => Ok(Self::MentalPeace),
            "better-sleep" => Ok(Self::BetterSleep),
            "digestion" => Ok(Self::Digestion),
            "immunity" => Ok(Self::Immunity),
            other => Err(GoalParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Goal`] string.
#[derive(Debug, Clone)]
pub struct GoalParseError(pub String);

impl fmt::Display for GoalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid goal: {:?}", self.0)
    }
}

impl std::error::Error for GoalParseError {}

// ---------------------------------------------------------------------------

/// Declared diet type. Carried through to exporters; does not alter fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietType {
    Vegetarian,
    Vegan,
    Eggetarian,
    NonVegetarian,
    Jain,
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::Eggetarian => "eggetarian",
            Self::NonVegetarian => "non-vegetarian",
            Self::Jain => "jain",
        };
        f.write_str(s)
    }
}

impl FromStr for DietType {
    type Err = DietTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vegetarian" | "veg" => Ok(Self::Vegetarian),
            "vegan" => Ok(Self::Vegan),
            "eggetarian" => Ok(Self::Eggetarian),
            "non-vegetarian" | "non-veg" => Ok(Self::NonVegetarian),
            "jain" => Ok(Self::Jain),
            other => Err(DietTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`DietType`] string.
#[derive(Debug, Clone)]
pub struct DietTypeParseError(pub String);

impl fmt::Display for DietTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid diet type: {:?}", self.0)
    }
}

impl std::error::Error for DietTypeParseError {}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// Normalized user profile. Serialized in camelCase, matching the form's
/// JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    pub name: String,
    /// Years. Kept signed so that nonsense input can be reported by
    /// [`validate`] instead of being lost in coercion.
    pub age: Option<i64>,
    pub locale: Locale,
    pub dosha: Option<Dosha>,
    pub goal: Option<Goal>,
    pub schedule: Schedule,
    pub body: Body,
    pub health: Health,
    pub goal_window: GoalWindow,
    pub lifestyle: Lifestyle,
    /// Unrecognized top-level fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Intake {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: None,
            locale: Locale::En,
            dosha: None,
            goal: None,
            schedule: Schedule::default(),
            body: Body::default(),
            health: Health::default(),
            goal_window: GoalWindow::default(),
            lifestyle: Lifestyle::default(),
            extra: Map::new(),
        }
    }
}

/// Daily rhythm. Times are always valid `HH:MM` after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub wake_time: String,
    pub sleep_time: String,
    pub meals_per_day: Option<i64>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            wake_time: DEFAULT_WAKE_TIME.to_string(),
            sleep_time: DEFAULT_SLEEP_TIME.to_string(),
            meals_per_day: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub pregnant: bool,
    pub trimester: Option<i64>,
}

/// Optional goal time frame. Dates are kept as supplied (ISO `YYYY-MM-DD`
/// expected) and parsed during validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalWindow {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifestyle {
    pub diet_type: Option<DietType>,
    pub religion: Option<String>,
    pub problems: Vec<String>,
    pub symptoms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_display_roundtrips_through_from_str() {
        for goal in [
            Goal::WeightLoss,
            Goal::EnergyBoost,
            Goal::MentalPeace,
            Goal::BetterSleep,
            Goal::Digestion,
            Goal::Immunity,
        ] {
            assert_eq!(goal.to_string().parse::<Goal>().unwrap(), goal);
        }
    }

    #[test]
    fn dosha_accepts_tridosha_alias() {
        assert_eq!("tridosha".parse::<Dosha>().unwrap(), Dosha::Mixed);
        assert!("earth".parse::<Dosha>().is_err());
    }

    #[test]
    fn parse_errors_name_the_bad_value() {
        let err = "xx".parse::<Locale>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported locale: \"xx\"");
        let err = "keto".parse::<DietType>().unwrap_err();
        assert_eq!(err.to_string(), "invalid diet type: \"keto\"");
    }

    #[test]
    fn default_intake_uses_default_times() {
        let intake = Intake::default();
        assert_eq!(intake.schedule.wake_time, "06:30");
        assert_eq!(intake.schedule.sleep_time, "22:30");
        assert_eq!(intake.locale, Locale::En);
    }

    #[test]
    fn intake_serializes_camel_case_with_flattened_extra() {
        let mut intake = Intake::default();
        intake
            .extra
            .insert("referral".to_string(), Value::String("clinic".into()));
        let json = serde_json::to_value(&intake).unwrap();
        assert_eq!(json["schedule"]["wakeTime"], "06:30");
        assert_eq!(json["referral"], "clinic");
        assert!(json.get("extra").is_none());
    }
}
