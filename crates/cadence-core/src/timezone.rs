use crate::error::RecurrenceError;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, RecurrenceError> {
    Tz::from_str(timezone)
        .map_err(|_| RecurrenceError::InvalidTimezone(format!("Invalid timezone: {}", timezone)))
}

/// Which of two instants an ambiguous wall-clock time maps to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Fold {
    /// The first pass through the repeated hour, before clocks go back
    #[default]
    Earlier,
    Later,
}

impl Fold {
    /// Fold of an existing date-time: `Later` only for the second pass of a repeated hour.
    pub fn of(dt: &DateTime<Tz>) -> Self {
        match dt.timezone().from_local_datetime(&dt.naive_local()) {
            LocalResult::Ambiguous(_, later) if later == *dt => Fold::Later,
            _ => Fold::Earlier,
        }
    }
}

/// Map a wall-clock time in `tz` to a concrete instant.
///
/// Ambiguous times (fall back) resolve to the earlier instant. Times inside a
/// spring-forward gap keep the offset in force before the gap, which lands on
/// the instant the wall clock would have shown without the transition.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    localize_with_fold(tz, naive, Fold::Earlier)
}

/// Like [`localize`], with an explicit choice for ambiguous times.
pub fn localize_with_fold(tz: &Tz, naive: NaiveDateTime, fold: Fold) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, later) => match fold {
            Fold::Earlier => earlier,
            Fold::Later => later,
        },
        LocalResult::None => {
            let offset = naive
                .checked_sub_signed(Duration::hours(GAP_LOOKBACK_HOURS))
                .and_then(|before| tz.from_local_datetime(&before).earliest())
                .map_or(0, |before| before.offset().fix().local_minus_utc());
            let utc = naive
                .checked_sub_signed(Duration::seconds(i64::from(offset)))
                .unwrap_or(naive);
            tz.from_utc_datetime(&utc)
        }
    }
}

// Far enough back to be clear of any real gap
const GAP_LOOKBACK_HOURS: i64 = 3;

/// Local midnight at the start of `date` in `tz`
pub fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    localize(tz, date.and_time(NaiveTime::MIN))
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if parse_timezone(&tz).is_ok() {
            return tz;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if parse_timezone(tz).is_ok() {
                return tz.to_string();
            }
        }
    }

    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if parse_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    "UTC".to_string()
}
