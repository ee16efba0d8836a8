use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a string does not name a variant of one of the closed enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} value: {value:?}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
///
/// Variants are declared in ascending order, so the derived `Ord` doubles as
/// the clinical ordering (mild < moderate < severe < critical).
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                $(
                    if normalized == $s.to_ascii_lowercase() {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ParseEnumError {
                    field: stringify!($name).into(),
                    value: s.into(),
                })
            }
        }
    };
}

pub(crate) use str_enum;

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Unknown => "unknown",
});

str_enum!(Severity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
    Critical => "critical",
});

str_enum!(Urgency {
    Routine => "routine",
    Urgent => "urgent",
    Emergency => "emergency",
});

str_enum!(ConfidenceLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// The reasoning service's verdict on the classifier's label.
str_enum!(MlValidation {
    Correct => "Correct",
    PartiallyCorrect => "Partially Correct",
    Incorrect => "Incorrect",
    Unsure => "Unsure",
});

str_enum!(Provenance {
    ModelOnly => "ML Model",
    ModelWithReasoning => "ML Model + Reasoning Service",
});

impl Severity {
    /// Urgency implied by a severity when nothing else overrides it.
    pub fn default_urgency(self) -> Urgency {
        match self {
            Severity::Mild | Severity::Moderate => Urgency::Routine,
            Severity::Severe => Urgency::Urgent,
            Severity::Critical => Urgency::Emergency,
        }
    }

    /// Inclusive lower / exclusive upper bound of this bucket on the 0–10 scale.
    pub fn score_band(self) -> (f64, f64) {
        match self {
            Severity::Mild => (0.0, 3.0),
            Severity::Moderate => (3.0, 6.0),
            Severity::Severe => (6.0, 8.0),
            Severity::Critical => (8.0, 10.0),
        }
    }

    /// Bucket a 0–10 severity score.
    pub fn from_score(score: f64) -> Self {
        if score < 3.0 {
            Severity::Mild
        } else if score < 6.0 {
            Severity::Moderate
        } else if score < 8.0 {
            Severity::Severe
        } else {
            Severity::Critical
        }
    }
}

impl ConfidenceLevel {
    /// Bucket a classifier probability.
    pub fn from_probability(p: f64) -> Self {
        if p >= 0.7 {
            ConfidenceLevel::High
        } else if p >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Unknown
    }
}
