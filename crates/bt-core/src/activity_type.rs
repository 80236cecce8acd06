//! Activity type enum as the single source of truth for activity type strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::ValidationError;

/// The closed set of things that can be logged for a baby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityType {
    Feed,
    Pump,
    Diaper,
    Sleep,
    Growth,
    Health,
    Milestone,
}

impl ActivityType {
    /// Every activity type, in display order.
    pub const ALL: [Self; 7] = [
        Self::Feed,
        Self::Pump,
        Self::Diaper,
        Self::Sleep,
        Self::Growth,
        Self::Health,
        Self::Milestone,
    ];

    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Pump => "pump",
            Self::Diaper => "diaper",
            Self::Sleep => "sleep",
            Self::Growth => "growth",
            Self::Health => "health",
            Self::Milestone => "milestone",
        }
    }

    /// Whether activities of this type can be recorded with a running timer.
    #[must_use]
    pub const fn is_timed(&self) -> bool {
        matches!(self, Self::Feed | Self::Pump | Self::Sleep)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feed" => Ok(Self::Feed),
            "pump" => Ok(Self::Pump),
            "diaper" => Ok(Self::Diaper),
            "sleep" => Ok(Self::Sleep),
            "growth" => Ok(Self::Growth),
            "health" => Ok(Self::Health),
            "milestone" => Ok(Self::Milestone),
            _ => Err(ValidationError::UnknownValue {
                field: "activity type",
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for ActivityType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_variants() {
        for variant in &ActivityType::ALL {
            let s = variant.to_string();
            let parsed: ActivityType = s.parse().expect("should parse");
            assert_eq!(parsed, *variant, "roundtrip failed for {variant:?}");
        }
    }

    #[test]
    fn only_feed_pump_and_sleep_are_timed() {
        let timed: Vec<_> = ActivityType::ALL
            .iter()
            .filter(|kind| kind.is_timed())
            .copied()
            .collect();
        assert_eq!(
            timed,
            vec![ActivityType::Feed, ActivityType::Pump, ActivityType::Sleep]
        );
    }

    #[test]
    fn unknown_type_errors() {
        let err = "nap".parse::<ActivityType>().unwrap_err();
        assert_eq!(err.to_string(), "invalid activity type: nap");
    }

    #[test]
    fn serializes_as_lowercase_string() {
        let json = serde_json::to_string(&ActivityType::Milestone).unwrap();
        assert_eq!(json, "\"milestone\"");
        let parsed: ActivityType = serde_json::from_str("\"diaper\"").unwrap();
        assert_eq!(parsed, ActivityType::Diaper);
    }
}
