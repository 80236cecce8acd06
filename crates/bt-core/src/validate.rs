//! Input validation for activities, timers and babies.
//!
//! All limits live in [`ValidationLimits`] so that a [`Validator`] can be built
//! once and handed to whatever needs it. Nothing here touches storage.

use chrono::{DateTime, Datelike, Utc};

use crate::activity::{NewActivity, TimerStart, TimerStop};
use crate::activity_type::ActivityType;
use crate::baby::NewBaby;
use crate::detail::{
    ActivityDetail, DiaperDetail, FeedDetail, GrowthDetail, HealthDetail, HealthRecordType,
    MilestoneDetail, PumpDetail, SleepDetail,
};
use crate::types::ValidationError;

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn check(self, field: &'static str, value: f64) -> Result<(), ValidationError> {
        if value.is_finite() && value >= self.min && value <= self.max {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange {
                field,
                min: self.min,
                max: self.max,
                value,
            })
        }
    }
}

/// Every accepted range and length limit.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationLimits {
    pub notes_max_chars: usize,
    pub feed_amount_ml: Bounds,
    pub feed_duration_minutes: Bounds,
    pub pump_amount_ml: Bounds,
    pub pump_duration_minutes: Bounds,
    pub sleep_location_max_chars: usize,
    pub sleep_quality: Bounds,
    pub weight_kg: Bounds,
    pub height_cm: Bounds,
    pub head_circumference_cm: Bounds,
    pub provider_max_chars: usize,
    pub vaccine_name_max_chars: usize,
    pub health_text_max_chars: usize,
    pub milestone_type_max_chars: usize,
    pub milestone_description_max_chars: usize,
    pub baby_name_max_chars: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            notes_max_chars: 1000,
            feed_amount_ml: Bounds::new(0.0, 1000.0),
            feed_duration_minutes: Bounds::new(0.0, 180.0),
            pump_amount_ml: Bounds::new(0.0, 500.0),
            pump_duration_minutes: Bounds::new(0.0, 120.0),
            sleep_location_max_chars: 50,
            sleep_quality: Bounds::new(1.0, 5.0),
            weight_kg: Bounds::new(0.5, 50.0),
            height_cm: Bounds::new(20.0, 150.0),
            head_circumference_cm: Bounds::new(20.0, 60.0),
            provider_max_chars: 100,
            vaccine_name_max_chars: 100,
            health_text_max_chars: 500,
            milestone_type_max_chars: 50,
            milestone_description_max_chars: 500,
            baby_name_max_chars: 100,
        }
    }
}

/// Checks user input against a set of [`ValidationLimits`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validator {
    limits: ValidationLimits,
}

/// Whether a detail comes from a manual log or a timer start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Manual,
    Timer,
}

impl Validator {
    #[must_use]
    pub const fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub const fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Validates a manually logged (or fully replaced) activity.
    pub fn validate_new_activity(&self, activity: &NewActivity) -> Result<(), ValidationError> {
        self.check_notes(&activity.notes)?;
        check_year("start_time", activity.start_time)?;
        if let Some(end) = activity.end_time {
            check_year("end_time", end)?;
        }
        if activity.end_time.is_some_and(|end| end < activity.start_time) {
            return Err(ValidationError::EndBeforeStart);
        }

        match &activity.detail {
            Some(detail) => self.check_detail(activity.kind, detail, Origin::Manual),
            None if activity.kind == ActivityType::Sleep => Ok(()),
            None => Err(ValidationError::Required {
                field: detail_field(activity.kind),
            }),
        }
    }

    /// Validates a timer start request.
    pub fn validate_timer_start(&self, start: &TimerStart) -> Result<(), ValidationError> {
        if !start.kind.is_timed() {
            return Err(ValidationError::NotTimed { kind: start.kind });
        }
        self.check_notes(&start.notes)?;
        match &start.detail {
            Some(detail) => self.check_detail(start.kind, detail, Origin::Timer),
            None => Ok(()),
        }
    }

    /// Validates the final values supplied when stopping a timer of `kind`.
    ///
    /// Fields that do not apply to `kind` are ignored.
    pub fn validate_timer_stop(
        &self,
        kind: ActivityType,
        stop: &TimerStop,
    ) -> Result<(), ValidationError> {
        if let Some(notes) = &stop.notes {
            self.check_notes(notes)?;
        }
        match kind {
            ActivityType::Feed => {
                if let Some(amount) = stop.amount_ml {
                    self.limits.feed_amount_ml.check("amount_ml", amount)?;
                }
            }
            ActivityType::Pump => {
                if let Some(amount) = stop.amount_ml {
                    self.limits.pump_amount_ml.check("amount_ml", amount)?;
                }
            }
            ActivityType::Sleep => {
                if let Some(quality) = stop.quality {
                    self.limits
                        .sleep_quality
                        .check("quality", f64::from(quality))?;
                }
            }
            ActivityType::Diaper
            | ActivityType::Growth
            | ActivityType::Health
            | ActivityType::Milestone => {}
        }
        Ok(())
    }

    /// Validates a new baby profile.
    pub fn validate_new_baby(&self, baby: &NewBaby) -> Result<(), ValidationError> {
        if baby.name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        check_len("name", &baby.name, self.limits.baby_name_max_chars)?;
        if let Some(weight) = baby.birth_weight_kg {
            self.limits.weight_kg.check("birth_weight_kg", weight)?;
        }
        if let Some(height) = baby.birth_height_cm {
            self.limits.height_cm.check("birth_height_cm", height)?;
        }
        Ok(())
    }

    fn check_notes(&self, notes: &str) -> Result<(), ValidationError> {
        check_len("notes", notes, self.limits.notes_max_chars)
    }

    fn check_detail(
        &self,
        kind: ActivityType,
        detail: &ActivityDetail,
        origin: Origin,
    ) -> Result<(), ValidationError> {
        if detail.kind() != kind {
            return Err(ValidationError::DetailMismatch {
                kind,
                detail: detail.kind(),
            });
        }
        match detail {
            ActivityDetail::Feed(feed) => self.check_feed(feed, origin),
            ActivityDetail::Pump(pump) => self.check_pump(pump, origin),
            ActivityDetail::Diaper(diaper) => check_diaper(diaper),
            ActivityDetail::Sleep(sleep) => self.check_sleep(sleep),
            ActivityDetail::Growth(growth) => self.check_growth(growth),
            ActivityDetail::Health(health) => self.check_health(health),
            ActivityDetail::Milestone(milestone) => self.check_milestone(milestone),
        }
    }

    fn check_feed(&self, feed: &FeedDetail, origin: Origin) -> Result<(), ValidationError> {
        if origin == Origin::Manual && feed.method.is_none() {
            return Err(ValidationError::Required { field: "feed_type" });
        }
        if let Some(amount) = feed.amount_ml {
            self.limits.feed_amount_ml.check("amount_ml", amount)?;
        }
        if let Some(minutes) = feed.duration_minutes {
            self.limits
                .feed_duration_minutes
                .check("duration_minutes", minutes_as_f64(minutes))?;
        }
        Ok(())
    }

    fn check_pump(&self, pump: &PumpDetail, origin: Origin) -> Result<(), ValidationError> {
        if origin == Origin::Manual && pump.side.is_none() {
            return Err(ValidationError::Required { field: "breast" });
        }
        if let Some(amount) = pump.amount_ml {
            self.limits.pump_amount_ml.check("amount_ml", amount)?;
        }
        if let Some(minutes) = pump.duration_minutes {
            self.limits
                .pump_duration_minutes
                .check("duration_minutes", minutes_as_f64(minutes))?;
        }
        Ok(())
    }

    fn check_sleep(&self, sleep: &SleepDetail) -> Result<(), ValidationError> {
        if let Some(location) = &sleep.location {
            check_len("location", location, self.limits.sleep_location_max_chars)?;
        }
        if let Some(quality) = sleep.quality {
            self.limits
                .sleep_quality
                .check("quality", f64::from(quality))?;
        }
        Ok(())
    }

    fn check_growth(&self, growth: &GrowthDetail) -> Result<(), ValidationError> {
        if growth.weight_kg.is_none()
            && growth.height_cm.is_none()
            && growth.head_circumference_cm.is_none()
        {
            return Err(ValidationError::NoGrowthMeasurement);
        }
        if let Some(weight) = growth.weight_kg {
            self.limits.weight_kg.check("weight_kg", weight)?;
        }
        if let Some(height) = growth.height_cm {
            self.limits.height_cm.check("height_cm", height)?;
        }
        if let Some(head) = growth.head_circumference_cm {
            self.limits
                .head_circumference_cm
                .check("head_circumference_cm", head)?;
        }
        Ok(())
    }

    fn check_health(&self, health: &HealthDetail) -> Result<(), ValidationError> {
        let limits = &self.limits;
        if let Some(provider) = &health.provider {
            check_len("provider", provider, limits.provider_max_chars)?;
        }
        match health.vaccine_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                check_len("vaccine_name", name, limits.vaccine_name_max_chars)?;
            }
            _ if health.record_type == HealthRecordType::Vaccine => {
                return Err(ValidationError::VaccineNameRequired);
            }
            _ => {}
        }
        if let Some(symptoms) = &health.symptoms {
            check_len("symptoms", symptoms, limits.health_text_max_chars)?;
        }
        if let Some(treatment) = &health.treatment {
            check_len("treatment", treatment, limits.health_text_max_chars)?;
        }
        Ok(())
    }

    fn check_milestone(&self, milestone: &MilestoneDetail) -> Result<(), ValidationError> {
        if milestone.milestone_type.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "milestone_type",
            });
        }
        check_len(
            "milestone_type",
            &milestone.milestone_type,
            self.limits.milestone_type_max_chars,
        )?;
        if let Some(description) = &milestone.description {
            check_len(
                "description",
                description,
                self.limits.milestone_description_max_chars,
            )?;
        }
        Ok(())
    }
}

fn check_diaper(diaper: &DiaperDetail) -> Result<(), ValidationError> {
    if diaper.wet || diaper.dirty {
        Ok(())
    } else {
        Err(ValidationError::DiaperNotWetOrDirty)
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        Err(ValidationError::TooLong { field, max })
    } else {
        Ok(())
    }
}

/// Stored timestamps are four-digit-year RFC 3339 text.
fn check_year(field: &'static str, instant: DateTime<Utc>) -> Result<(), ValidationError> {
    let year = instant.year();
    if (1..=9999).contains(&year) {
        Ok(())
    } else {
        Err(ValidationError::YearOutOfRange { field, year })
    }
}

const fn detail_field(kind: ActivityType) -> &'static str {
    match kind {
        ActivityType::Feed => "feed_data",
        ActivityType::Pump => "pump_data",
        ActivityType::Diaper => "diaper_data",
        ActivityType::Sleep => "sleep_data",
        ActivityType::Growth => "growth_data",
        ActivityType::Health => "health_data",
        ActivityType::Milestone => "milestone_data",
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "durations are bounded far below f64's exact integer range"
)]
fn minutes_as_f64(minutes: i64) -> f64 {
    minutes as f64
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::detail::{BreastSide, FeedMethod};

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn manual(kind: ActivityType, detail: Option<ActivityDetail>) -> NewActivity {
        NewActivity {
            baby_id: None,
            kind,
            start_time: at("2025-01-01T08:00:00Z"),
            end_time: None,
            notes: String::new(),
            detail,
        }
    }

    fn bottle(amount: f64) -> ActivityDetail {
        ActivityDetail::Feed(FeedDetail {
            method: Some(FeedMethod::Bottle),
            amount_ml: Some(amount),
            duration_minutes: None,
        })
    }

    #[test]
    fn accepts_valid_feed() {
        let validator = Validator::default();
        assert!(
            validator
                .validate_new_activity(&manual(ActivityType::Feed, Some(bottle(120.0))))
                .is_ok()
        );
    }

    #[test]
    fn feed_amount_bounds_are_inclusive() {
        let validator = Validator::default();
        for ok in [0.0, 1000.0] {
            let activity = manual(ActivityType::Feed, Some(bottle(ok)));
            assert!(validator.validate_new_activity(&activity).is_ok(), "{ok}");
        }
        let err = validator
            .validate_new_activity(&manual(ActivityType::Feed, Some(bottle(1000.5))))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange {
                field: "amount_ml",
                ..
            }
        ));
    }

    #[test]
    fn detail_required_except_for_sleep() {
        let validator = Validator::default();
        assert!(
            validator
                .validate_new_activity(&manual(ActivityType::Sleep, None))
                .is_ok()
        );
        let err = validator
            .validate_new_activity(&manual(ActivityType::Diaper, None))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Required {
                field: "diaper_data"
            }
        );
    }

    #[test]
    fn detail_must_match_type() {
        let err = Validator::default()
            .validate_new_activity(&manual(ActivityType::Pump, Some(bottle(50.0))))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DetailMismatch {
                kind: ActivityType::Pump,
                detail: ActivityType::Feed,
            }
        );
    }

    #[test]
    fn end_before_start_rejected() {
        let mut activity = manual(ActivityType::Sleep, None);
        activity.end_time = Some(at("2025-01-01T07:59:00Z"));
        assert_eq!(
            Validator::default().validate_new_activity(&activity),
            Err(ValidationError::EndBeforeStart)
        );
    }

    #[test]
    fn timestamps_need_four_digit_years() {
        let validator = Validator::default();
        let mut activity = manual(ActivityType::Sleep, None);
        let midnight = |year| {
            NaiveDate::from_ymd_opt(year, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                .and_utc()
        };
        activity.end_time = Some(midnight(10000));
        assert_eq!(
            validator.validate_new_activity(&activity),
            Err(ValidationError::YearOutOfRange {
                field: "end_time",
                year: 10000
            })
        );

        activity.start_time = midnight(0);
        activity.end_time = None;
        assert_eq!(
            validator.validate_new_activity(&activity),
            Err(ValidationError::YearOutOfRange {
                field: "start_time",
                year: 0
            })
        );

        activity.start_time = at("9999-12-31T23:59:59Z");
        assert!(validator.validate_new_activity(&activity).is_ok());
    }

    #[test]
    fn notes_limit_counts_characters() {
        let validator = Validator::default();
        let mut activity = manual(ActivityType::Sleep, None);
        activity.notes = "é".repeat(1000);
        assert!(validator.validate_new_activity(&activity).is_ok());
        activity.notes.push('x');
        assert_eq!(
            validator.validate_new_activity(&activity),
            Err(ValidationError::TooLong {
                field: "notes",
                max: 1000
            })
        );
    }

    #[test]
    fn diaper_needs_wet_or_dirty() {
        let detail = ActivityDetail::Diaper(DiaperDetail::default());
        assert_eq!(
            Validator::default().validate_new_activity(&manual(ActivityType::Diaper, Some(detail))),
            Err(ValidationError::DiaperNotWetOrDirty)
        );
    }

    #[test]
    fn growth_needs_a_measurement_in_range() {
        let validator = Validator::default();
        let empty = ActivityDetail::Growth(GrowthDetail::default());
        assert_eq!(
            validator.validate_new_activity(&manual(ActivityType::Growth, Some(empty))),
            Err(ValidationError::NoGrowthMeasurement)
        );

        let tiny = ActivityDetail::Growth(GrowthDetail {
            weight_kg: Some(0.4),
            ..GrowthDetail::default()
        });
        assert!(
            validator
                .validate_new_activity(&manual(ActivityType::Growth, Some(tiny)))
                .is_err()
        );
    }

    #[test]
    fn vaccine_records_need_a_name() {
        let validator = Validator::default();
        let mut health = HealthDetail {
            record_type: HealthRecordType::Vaccine,
            provider: None,
            vaccine_name: Some("  ".to_string()),
            symptoms: None,
            treatment: None,
        };
        assert_eq!(
            validator.validate_new_activity(&manual(
                ActivityType::Health,
                Some(ActivityDetail::Health(health.clone()))
            )),
            Err(ValidationError::VaccineNameRequired)
        );

        health.record_type = HealthRecordType::Checkup;
        assert!(
            validator
                .validate_new_activity(&manual(
                    ActivityType::Health,
                    Some(ActivityDetail::Health(health))
                ))
                .is_ok()
        );
    }

    #[test]
    fn manual_pump_needs_a_side_but_timer_does_not() {
        let validator = Validator::default();
        let pump = ActivityDetail::Pump(PumpDetail::default());
        assert_eq!(
            validator.validate_new_activity(&manual(ActivityType::Pump, Some(pump.clone()))),
            Err(ValidationError::Required { field: "breast" })
        );

        let start = TimerStart {
            baby_id: None,
            kind: ActivityType::Pump,
            notes: String::new(),
            detail: Some(pump),
        };
        assert!(validator.validate_timer_start(&start).is_ok());

        let with_side = ActivityDetail::Pump(PumpDetail {
            side: Some(BreastSide::Left),
            ..PumpDetail::default()
        });
        assert!(
            validator
                .validate_new_activity(&manual(ActivityType::Pump, Some(with_side)))
                .is_ok()
        );
    }

    #[test]
    fn timers_only_for_timed_types() {
        let start = TimerStart {
            baby_id: None,
            kind: ActivityType::Diaper,
            notes: String::new(),
            detail: None,
        };
        assert_eq!(
            Validator::default().validate_timer_start(&start),
            Err(ValidationError::NotTimed {
                kind: ActivityType::Diaper
            })
        );
    }

    #[test]
    fn stop_checks_only_applicable_fields() {
        let validator = Validator::default();
        let stop = TimerStop {
            amount_ml: Some(600.0),
            quality: Some(9),
            notes: None,
        };
        assert!(validator.validate_timer_stop(ActivityType::Feed, &stop).is_ok());
        assert!(validator.validate_timer_stop(ActivityType::Pump, &stop).is_err());
        assert!(validator.validate_timer_stop(ActivityType::Sleep, &stop).is_err());
    }

    #[test]
    fn custom_limits_apply() {
        let validator = Validator::new(ValidationLimits {
            notes_max_chars: 5,
            ..ValidationLimits::default()
        });
        let stop = TimerStop {
            notes: Some("too long".to_string()),
            ..TimerStop::default()
        };
        assert!(validator.validate_timer_stop(ActivityType::Sleep, &stop).is_err());
    }

    #[test]
    fn baby_name_required() {
        let baby = NewBaby {
            name: " ".to_string(),
            birth_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            birth_weight_kg: None,
            birth_height_cm: None,
            sleep_tracking: true,
        };
        assert_eq!(
            Validator::default().validate_new_baby(&baby),
            Err(ValidationError::Empty { field: "name" })
        );
    }
}
