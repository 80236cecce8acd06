//! Core type definitions with validation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::activity_type::ActivityType;

/// Validation errors for core types and user input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A required field was not supplied.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A text field exceeded its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// A numeric field was outside its allowed range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    /// A value was not one of the accepted options.
    #[error("invalid {field}: {value}")]
    UnknownValue { field: &'static str, value: String },

    /// The detail payload does not belong to the activity's type.
    #[error("{detail} details cannot be attached to a {kind} activity")]
    DetailMismatch {
        kind: ActivityType,
        detail: ActivityType,
    },

    /// A diaper must be wet, dirty, or both.
    #[error("diaper must be wet, dirty, or both")]
    DiaperNotWetOrDirty,

    /// A growth record needs at least one measurement.
    #[error("at least one measurement (weight, height, or head circumference) is required")]
    NoGrowthMeasurement,

    /// Vaccine records need a vaccine name.
    #[error("vaccine_name is required for vaccine records")]
    VaccineNameRequired,

    /// The end time precedes the start time.
    #[error("end time must be after start time")]
    EndBeforeStart,

    /// Timers can only run for activities with a duration.
    #[error("timers are only supported for feed, pump and sleep activities, got {kind}")]
    NotTimed { kind: ActivityType },

    /// A date string was not `YYYY-MM-DD`.
    #[error("invalid date format, use YYYY-MM-DD: {value}")]
    InvalidDate { value: String },

    /// Statistics were requested for a day before the baby was born.
    #[error("cannot query {date}, which is before the birth date {birth_date}")]
    BeforeBirth {
        date: NaiveDate,
        birth_date: NaiveDate,
    },

    /// The day's UTC bounds cannot be represented.
    #[error("date {date} is outside the supported range")]
    DateOutOfRange { date: NaiveDate },

    /// A timestamp is outside years 1 through 9999.
    #[error("{field} must be between years 1 and 9999, got year {year}")]
    YearOutOfRange { field: &'static str, year: i32 },

    /// The timezone offset is not a real UTC offset.
    #[error("timezone offset must be within ±14 hours, got {minutes} minutes")]
    TzOffsetOutOfRange { minutes: i32 },
}

/// Generates a closed string enum with storage/display names and parsing.
macro_rules! define_string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted value.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// String representation for database storage.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::types::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err($crate::types::ValidationError::UnknownValue {
                        field: $field_name,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use define_string_enum;

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Generates a fresh random ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated activity identifier.
    ActivityId, "activity ID"
);

define_string_id!(
    /// A validated baby identifier.
    BabyId, "baby ID"
);

define_string_id!(
    /// A validated user identifier.
    ///
    /// This is the opaque identity handed to every store operation; the store
    /// never trusts a baby or activity id without checking it against this.
    UserId, "user ID"
);

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_id_rejects_empty() {
        assert!(ActivityId::new("").is_err());
        assert!(ActivityId::new("   ").is_err());
        assert!(ActivityId::new("valid-id").is_ok());
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(BabyId::generate(), BabyId::generate());
    }

    #[test]
    fn user_id_serde_roundtrip() {
        let id = UserId::new("user-123").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-123\"");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn baby_id_serde_rejects_empty() {
        let result: Result<BabyId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(
            parse_date("2025-03-09").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
        );
    }

    #[test]
    fn parse_date_rejects_malformed_input() {
        for bad in ["", "2025-13-01", "09/03/2025", "2025-03-09T00:00:00Z", "yesterday"] {
            let err = parse_date(bad).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidDate { .. }),
                "expected InvalidDate for {bad:?}"
            );
        }
    }
}
