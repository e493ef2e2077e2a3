//! Daily trigger arithmetic for the reset scheduler.
//!
//! A [`DailySchedule`] is a wall-clock time (`HH:MM`) in a fixed UTC offset.
//! The only question it answers is "when is the next trigger strictly after
//! this instant?", which the scheduler asks on startup and after each fire.
//! Asking the question fresh every time keeps the timer from drifting and
//! means a process that was down over a trigger never fires for it late.

use std::fmt;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, Offset, TimeZone, Utc};

/// Errors that can occur when building or evaluating a schedule.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The time of day is not `HH:MM` with `HH < 24` and `MM < 60`.
    #[error("invalid reset time {input:?}: expected HH:MM")]
    InvalidTime {
        /// The rejected input.
        input: String,
    },

    /// The UTC offset is not `+HH:MM` / `-HH:MM` within +-23:59.
    #[error("invalid UTC offset {input:?}: expected +HH:MM or -HH:MM")]
    InvalidOffset {
        /// The rejected input.
        input: String,
    },

    /// The next trigger falls outside the range `chrono` can represent.
    #[error("next trigger after {after} is out of range")]
    OutOfRange {
        /// The instant the search started from.
        after: DateTime<Utc>,
    },
}

/// A fixed local time of day at which something fires, once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
    offset: FixedOffset,
}

impl DailySchedule {
    /// Build a schedule from an already-validated time and offset.
    pub const fn new(time: NaiveTime, offset: FixedOffset) -> Self {
        Self { time, offset }
    }

    /// Parse a schedule from `HH:MM` and `+HH:MM` strings.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidTime`] or
    /// [`ScheduleError::InvalidOffset`] for malformed input.
    pub fn parse(time: &str, offset: &str) -> Result<Self, ScheduleError> {
        Ok(Self::new(parse_time(time)?, parse_offset(offset)?))
    }

    /// UTC offset the trigger time is expressed in.
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The first trigger instant strictly later than `after`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::OutOfRange`] only at the edges of the
    /// representable calendar.
    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        let out_of_range = || ScheduleError::OutOfRange { after };

        let local_day = after.with_timezone(&self.offset).date_naive();
        let today = self
            .offset
            .from_local_datetime(&local_day.and_time(self.time))
            .single()
            .ok_or_else(out_of_range)?
            .with_timezone(&Utc);

        if today > after {
            return Ok(today);
        }

        let next_day = local_day
            .checked_add_days(Days::new(1))
            .ok_or_else(out_of_range)?;
        self.offset
            .from_local_datetime(&next_day.and_time(self.time))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(out_of_range)
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.time.format("%H:%M"), self.offset)
    }
}

/// Parse `HH:MM` into a time of day.
fn parse_time(input: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_e| ScheduleError::InvalidTime {
        input: input.to_owned(),
    })
}

/// Parse `+HH:MM` / `-HH:MM` (or `Z`) into a fixed offset.
fn parse_offset(input: &str) -> Result<FixedOffset, ScheduleError> {
    let invalid = || ScheduleError::InvalidOffset {
        input: input.to_owned(),
    };

    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match trimmed.split_at_checked(1) {
        Some(("+", rest)) => (1_i32, rest),
        Some(("-", rest)) => (-1_i32, rest),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_e| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_e| invalid())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    let seconds = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes.checked_mul(60)?))
        .and_then(|s| s.checked_mul(sign))
        .ok_or_else(invalid)?;
    FixedOffset::east_opt(seconds).ok_or_else(invalid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ist_2300() -> DailySchedule {
        DailySchedule::parse("23:00", "+05:30").unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn next_trigger_later_today() {
        // 10:00 IST on Jan 1 -> 23:00 IST the same day (17:30 UTC).
        let next = ist_2300().next_after(utc("2026-01-01T04:30:00Z")).unwrap();
        assert_eq!(next, utc("2026-01-01T17:30:00Z"));
    }

    #[test]
    fn next_trigger_rolls_to_tomorrow() {
        // 23:30 IST -> 23:00 IST next day.
        let next = ist_2300().next_after(utc("2026-01-01T18:00:00Z")).unwrap();
        assert_eq!(next, utc("2026-01-02T17:30:00Z"));
    }

    #[test]
    fn exact_trigger_instant_is_not_reused() {
        let at = utc("2026-01-01T17:30:00Z");
        let next = ist_2300().next_after(at).unwrap();
        assert_eq!(next, utc("2026-01-02T17:30:00Z"));
        assert!(next > at);
    }

    #[test]
    fn local_day_differs_from_utc_day() {
        // 20:00 UTC Jan 1 is 01:30 IST Jan 2; the next 23:00 IST is Jan 2.
        let next = ist_2300().next_after(utc("2026-01-01T20:00:00Z")).unwrap();
        assert_eq!(next, utc("2026-01-02T17:30:00Z"));
    }

    #[test]
    fn negative_offset() {
        let schedule = DailySchedule::parse("00:15", "-04:00").unwrap();
        let next = schedule.next_after(utc("2026-03-10T03:00:00Z")).unwrap();
        assert_eq!(next, utc("2026-03-10T04:15:00Z"));
    }

    #[test]
    fn utc_alias() {
        let schedule = DailySchedule::parse("06:00", "Z").unwrap();
        assert_eq!(schedule.offset(), Utc.fix());
    }

    #[test]
    fn rejects_bad_time() {
        assert!(matches!(
            DailySchedule::parse("24:00", "+00:00"),
            Err(ScheduleError::InvalidTime { .. })
        ));
        assert!(matches!(
            DailySchedule::parse("noon", "+00:00"),
            Err(ScheduleError::InvalidTime { .. })
        ));
    }

    #[test]
    fn rejects_bad_offset() {
        for bad in ["05:30", "+5", "+24:00", "+05:60", ""] {
            assert!(
                matches!(
                    DailySchedule::parse("23:00", bad),
                    Err(ScheduleError::InvalidOffset { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(ist_2300().to_string(), "23:00 +05:30");
    }
}
