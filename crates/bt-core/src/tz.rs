//! Caller timezone offsets.
//!
//! Callers send the offset the way a browser reports it: minutes, positive when
//! local time is *behind* UTC (`300` is UTC-5). chrono's [`FixedOffset`] is
//! east-positive, so the sign is flipped exactly once, here.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};

use crate::types::ValidationError;

const MAX_OFFSET_MINUTES: u32 = 14 * 60;

/// A validated fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzOffset(FixedOffset);

impl TzOffset {
    /// UTC itself.
    #[must_use]
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    /// Builds an offset from browser-style minutes (positive = behind UTC).
    pub fn from_browser_minutes(minutes: i32) -> Result<Self, ValidationError> {
        if minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
            return Err(ValidationError::TzOffsetOutOfRange { minutes });
        }
        FixedOffset::east_opt(-minutes * 60)
            .map(Self)
            .ok_or(ValidationError::TzOffsetOutOfRange { minutes })
    }

    /// The host's current local offset.
    #[must_use]
    pub fn host() -> Self {
        Self(*Local::now().offset())
    }

    /// The offset in browser-style minutes.
    #[must_use]
    pub fn browser_minutes(&self) -> i32 {
        -self.0.local_minus_utc() / 60
    }

    /// The chrono offset (east-positive).
    #[must_use]
    pub const fn fixed(&self) -> FixedOffset {
        self.0
    }

    /// The UTC instant at which `date` begins in this offset.
    ///
    /// `None` when that instant falls outside chrono's representable range.
    #[must_use]
    pub fn local_midnight(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_time(NaiveTime::MIN);
        let utc =
            local.checked_sub_signed(TimeDelta::seconds(i64::from(self.0.local_minus_utc())))?;
        Some(Utc.from_utc_datetime(&utc))
    }

    /// The calendar date `instant` falls on in this offset.
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }
}

impl Default for TzOffset {
    fn default() -> Self {
        Self::utc()
    }
}
