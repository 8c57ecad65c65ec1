use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::RecurrenceError;
use crate::rule::RecurrenceRule;
use crate::timezone::local_midnight;

/// A point on the calendar: either a whole day or a zoned date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instant {
    Date(NaiveDate),
    Timed(DateTime<Tz>),
}

impl Instant {
    /// Key used to order instants of mixed kinds. Dates sort as local midnight in `zone`.
    #[inline]
    pub fn sort_key(&self, zone: &Tz) -> DateTime<Utc> {
        match self {
            Instant::Date(date) => local_midnight(zone, *date).with_timezone(&Utc),
            Instant::Timed(dt) => dt.with_timezone(&Utc),
        }
    }

    /// The calendar date this instant falls on, in its own zone.
    #[inline]
    pub fn date(&self) -> NaiveDate {
        match self {
            Instant::Date(date) => *date,
            Instant::Timed(dt) => dt.date_naive(),
        }
    }

    /// The calendar date this instant falls on as seen from `zone`.
    pub fn local_date(&self, zone: &Tz) -> NaiveDate {
        match self {
            Instant::Date(date) => *date,
            Instant::Timed(dt) => dt.with_timezone(zone).date_naive(),
        }
    }

    #[inline]
    pub fn is_timed(&self) -> bool {
        matches!(self, Instant::Timed(_))
    }

    /// This instant moved forward by `duration`.
    ///
    /// Dates move in whole days and a partial day counts as a full one, so a
    /// date with a positive duration always ends on a later date.
    pub fn plus(&self, duration: Duration) -> Option<Instant> {
        match self {
            Instant::Date(date) => {
                let mut days = duration.num_days();
                if duration > Duration::days(days) {
                    days += 1;
                }
                date.checked_add_signed(Duration::days(days)).map(Instant::Date)
            }
            Instant::Timed(dt) => dt.checked_add_signed(duration).map(Instant::Timed),
        }
    }
}

impl From<NaiveDate> for Instant {
    fn from(date: NaiveDate) -> Self {
        Instant::Date(date)
    }
}

impl From<DateTime<Tz>> for Instant {
    fn from(dt: DateTime<Tz>) -> Self {
        Instant::Timed(dt)
    }
}

/// A repeating calendar entry as handed over by the storage layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringEntry {
    pub id: Uuid,
    pub start: Instant,
    pub duration: Option<Duration>,
    pub rule: RecurrenceRule,
    /// EXDATE values
    pub exdates: Vec<Instant>,
}

impl RecurringEntry {
    pub fn new(start: impl Into<Instant>, rule: RecurrenceRule) -> Self {
        Self {
            id: Uuid::now_v7(),
            start: start.into(),
            duration: None,
            rule,
            exdates: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_exdates(mut self, exdates: Vec<Instant>) -> Self {
        self.exdates = exdates;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// End of the given occurrence, or `None` when the entry has no duration.
    ///
    /// Durations on date entries are rounded up to whole days.
    pub fn occurrence_end(&self, occurrence: &Instant) -> Option<Instant> {
        occurrence.plus(self.duration?)
    }
}

/// A non-repeating entry, only needed for merging.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleEntry {
    pub id: Uuid,
    pub start: Instant,
    /// DTEND minus DTSTART, or DURATION
    pub duration: Option<Duration>,
}

impl SingleEntry {
    pub fn new(start: impl Into<Instant>) -> Self {
        Self {
            id: Uuid::now_v7(),
            start: start.into(),
            duration: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn end(&self) -> Option<Instant> {
        self.start.plus(self.duration?)
    }

    /// Whether the entry runs past the end of the local day it starts on.
    ///
    /// An end exactly at local midnight belongs to the previous day.
    pub fn crosses_midnight(&self, zone: &Tz) -> bool {
        let Some(end) = self.end() else {
            return false;
        };
        let last_day = match end {
            Instant::Date(date) => date.pred_opt(),
            Instant::Timed(dt) => {
                let local = dt.with_timezone(zone);
                if local.time() == NaiveTime::MIN {
                    local.date_naive().pred_opt()
                } else {
                    Some(local.date_naive())
                }
            }
        };
        last_day.is_some_and(|last| self.start.local_date(zone) < last)
    }
}

/// One concrete occurrence of an entry, produced per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurrence {
    pub entry_id: Uuid,
    pub at: Instant,
}

/// A half-open query range `[start, stop)` with the zone used to place dates.
///
/// Either bound may be absent. A missing stop is only valid for rules that end
/// on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub zone: Tz,
    pub start: Option<DateTime<Tz>>,
    pub stop: Option<DateTime<Tz>>,
}

impl QueryWindow {
    pub fn new(
        zone: Tz,
        start: Option<DateTime<Tz>>,
        stop: Option<DateTime<Tz>>,
    ) -> Result<Self, RecurrenceError> {
        let window = Self { zone, start, stop };
        window.validate()?;
        Ok(window)
    }

    /// Window from local midnight of `start` to local midnight of `stop`.
    pub fn dates(zone: Tz, start: NaiveDate, stop: NaiveDate) -> Result<Self, RecurrenceError> {
        Self::new(
            zone,
            Some(local_midnight(&zone, start)),
            Some(local_midnight(&zone, stop)),
        )
    }

    pub fn unbounded(zone: Tz) -> Self {
        Self {
            zone,
            start: None,
            stop: None,
        }
    }

    pub fn starting(mut self, start: DateTime<Tz>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn ending(mut self, stop: DateTime<Tz>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn validate(&self) -> Result<(), RecurrenceError> {
        if let (Some(start), Some(stop)) = (self.start, self.stop) {
            if start > stop {
                return Err(RecurrenceError::CallerContractViolation(format!(
                    "query start {} is after stop {}",
                    start, stop
                )));
            }
        }
        Ok(())
    }

    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        self.start.map(|dt| dt.with_timezone(&Utc))
    }

    pub fn stop_utc(&self) -> Option<DateTime<Utc>> {
        self.stop.map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether `instant` lies inside the window.
    pub fn contains(&self, instant: &Instant) -> bool {
        let key = instant.sort_key(&self.zone);
        self.start_utc().map_or(true, |start| key >= start)
            && self.stop_utc().map_or(true, |stop| key < stop)
    }
}
