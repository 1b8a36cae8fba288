//! Report day boundaries in a fixed civil timezone
//!
//! The window is computed from an explicit `now` and timezone, never from the
//! host's local timezone.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeWindowError {
    #[error("invalid timezone '{name}': {reason}")]
    InvalidTimezone { name: String, reason: String },

    #[error("local time {local} does not exist in {tz}")]
    NonexistentLocalTime { local: NaiveDateTime, tz: Tz },
}

/// Parse an IANA timezone name such as `Australia/Melbourne`
pub fn parse_timezone(name: &str) -> Result<Tz, TimeWindowError> {
    name.parse::<Tz>().map_err(|e| TimeWindowError::InvalidTimezone {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Start and end of one local day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl TimeWindow {
    /// Window for the local date that contains `now` in `tz`:
    /// 00:00:00 to 23:59:59 of that date.
    pub fn for_day(now: DateTime<Utc>, tz: Tz) -> Result<Self, TimeWindowError> {
        let midnight = now.with_timezone(&tz).date_naive().and_time(NaiveTime::MIN);
        let last_second = midnight + Duration::seconds(24 * 3600 - 1);
        let start = local_instant(tz, midnight)?;
        let end = local_instant(tz, last_second)?;
        Ok(Self { start, end })
    }

    /// Resolve by timezone name; an unknown name is an error
    pub fn resolve(now: DateTime<Utc>, tz_name: &str) -> Result<Self, TimeWindowError> {
        Self::for_day(now, parse_timezone(tz_name)?)
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    /// RFC 3339 with the local offset, the `from` query parameter
    pub fn from_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// RFC 3339 with the local offset, the `to` query parameter
    pub fn to_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

fn local_instant(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Tz>, TimeWindowError> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(t) => Ok(t),
        // Ambiguous during a backward DST shift: take the earlier instant
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(TimeWindowError::NonexistentLocalTime { local, tz }),
    }
}
