//! Normalized model of a recurring entry for one query window.
//!
//! [`RecurrenceDescriptor::build`] decides whether an entry can be expanded
//! analytically. It returns [`PatternSignal::Unsupported`] for anything outside
//! the rule shapes a calendar editor produces, and the orchestrator falls back
//! to the generic expander in that case.
//!
//! All arithmetic happens on naive date-times in a [`Frame`]: wall time for
//! dates and timed daily-or-longer rules, UTC for sub-day rules. Comparisons
//! against the window and the terminator use a key derived from the naive
//! value.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;
use tracing::trace;

use crate::error::{PatternSignal, RecurrenceError};
use crate::models::{Instant, QueryWindow, RecurringEntry};
use crate::rule::{Frequency, RecurrenceRule, RuleUntil, Terminator};
use crate::timezone::{local_midnight, localize, localize_with_fold, Fold};

/// Coordinate system an entry is expanded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Date entries. Keys are the naive dates read as UTC; the zone places window bounds.
    DateOnly(Tz),
    /// Timed entries repeating daily or slower, stepped in wall time.
    ///
    /// Ambiguous wall times take the same fold as the start.
    Local(Tz, Fold),
    /// Hourly and faster, stepped in UTC.
    Subday(Tz),
}

impl Frame {
    pub(crate) fn for_entry(entry: &RecurringEntry, window: &QueryWindow) -> Self {
        let subday = entry.rule.frequency.is_subday();
        match entry.start {
            Instant::Timed(dt) if subday => Frame::Subday(dt.timezone()),
            Instant::Date(_) if subday => Frame::Subday(window.zone),
            Instant::Timed(dt) => Frame::Local(dt.timezone(), Fold::of(&dt)),
            Instant::Date(_) => Frame::DateOnly(window.zone),
        }
    }

    pub(crate) fn is_timed(&self) -> bool {
        !matches!(self, Frame::DateOnly(_))
    }

    pub(crate) fn is_subday(&self) -> bool {
        matches!(self, Frame::Subday(_))
    }

    pub(crate) fn start_naive(&self, start: &Instant) -> NaiveDateTime {
        match (self, start) {
            (Frame::Subday(tz), Instant::Date(date)) => local_midnight(tz, *date).naive_utc(),
            (Frame::Subday(_), Instant::Timed(dt)) => dt.naive_utc(),
            (_, Instant::Date(date)) => date.and_time(NaiveTime::MIN),
            (_, Instant::Timed(dt)) => dt.naive_local(),
        }
    }

    pub(crate) fn key(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        match self {
            Frame::Local(tz, fold) => localize_with_fold(tz, naive, *fold).with_timezone(&Utc),
            Frame::DateOnly(_) | Frame::Subday(_) => naive.and_utc(),
        }
    }

    pub(crate) fn naive(&self, key: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Frame::Local(tz, _) => key.with_timezone(tz).naive_local(),
            Frame::DateOnly(_) | Frame::Subday(_) => key.naive_utc(),
        }
    }

    /// Key of a window bound.
    pub(crate) fn bound_key(&self, bound: &DateTime<Tz>) -> DateTime<Utc> {
        match self {
            Frame::DateOnly(zone) => bound.with_timezone(zone).naive_local().and_utc(),
            Frame::Local(..) | Frame::Subday(_) => bound.with_timezone(&Utc),
        }
    }

    /// Key of the last instant an UNTIL value admits.
    pub(crate) fn until_key(&self, until: &RuleUntil) -> DateTime<Utc> {
        match (self, until) {
            (Frame::DateOnly(_), RuleUntil::Date(date)) => date.and_time(NaiveTime::MIN).and_utc(),
            (Frame::DateOnly(zone), RuleUntil::Utc(dt)) => dt.with_timezone(zone).naive_local().and_utc(),
            (Frame::DateOnly(_), RuleUntil::Floating(naive)) => naive.and_utc(),
            (Frame::Local(tz, _) | Frame::Subday(tz), RuleUntil::Date(date)) => {
                local_midnight(tz, *date).with_timezone(&Utc)
            }
            (Frame::Local(..) | Frame::Subday(_), RuleUntil::Utc(dt)) => *dt,
            (Frame::Local(..), RuleUntil::Floating(naive)) => self.key(*naive),
            (Frame::Subday(tz), RuleUntil::Floating(naive)) => localize(tz, *naive).with_timezone(&Utc),
        }
    }

    pub(crate) fn instant(&self, key: DateTime<Utc>) -> Instant {
        match self {
            Frame::DateOnly(_) => Instant::Date(key.date_naive()),
            Frame::Local(tz, _) | Frame::Subday(tz) => Instant::Timed(key.with_timezone(tz)),
        }
    }
}

/// Exception dates resolved into a frame.
///
/// Date exceptions apply to date entries and to timed entries on the same
/// calendar date; sub-day entries only honour exact instants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ExclusionSet {
    instants: HashSet<DateTime<Utc>>,
    dates: HashSet<NaiveDate>,
}

impl ExclusionSet {
    pub(crate) fn new(frame: &Frame, exdates: &[Instant]) -> Self {
        let mut set = Self::default();
        for exdate in exdates {
            match (frame, exdate) {
                (Frame::DateOnly(_) | Frame::Local(..), Instant::Date(date)) => {
                    set.dates.insert(*date);
                }
                (Frame::Local(..) | Frame::Subday(_), Instant::Timed(dt)) => {
                    set.instants.insert(dt.with_timezone(&Utc));
                }
                _ => {}
            }
        }
        set
    }

    pub(crate) fn contains(&self, key: DateTime<Utc>, naive: NaiveDateTime) -> bool {
        self.instants.contains(&key) || self.dates.contains(&naive.date())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.instants.is_empty() && self.dates.is_empty()
    }
}

/// Distance between consecutive occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Fixed(Duration),
    /// Calendar months; the day of month never exceeds 28 or is a yearly non-leap day
    Months(u32),
    /// Day offsets of a multi-weekday weekly rule, starting from the start weekday
    Cycle(Vec<Duration>),
    OrdinalWeekday {
        months: u32,
        ordinal: i8,
        weekday: Weekday,
    },
}

impl Step {
    /// Moves `at` to the next candidate. `index` tracks the position in a cycle.
    pub(crate) fn advance(&self, at: NaiveDateTime, index: &mut usize) -> Option<NaiveDateTime> {
        match self {
            Step::Fixed(step) => at.checked_add_signed(*step),
            Step::Months(months) => at.checked_add_months(Months::new(*months)),
            Step::Cycle(offsets) => {
                let offset = offsets.get(*index)?;
                *index = (*index + 1) % offsets.len();
                at.checked_add_signed(*offset)
            }
            Step::OrdinalWeekday {
                months,
                ordinal,
                weekday,
            } => next_ordinal(at, *months, *ordinal, *weekday),
        }
    }

    /// The `n`-th candidate (zero based) counted from `start`.
    fn nth(&self, start: NaiveDateTime, n: u32) -> Option<NaiveDateTime> {
        match self {
            Step::Fixed(step) => {
                let ms = step.num_milliseconds().checked_mul(i64::from(n))?;
                start.checked_add_signed(Duration::milliseconds(ms))
            }
            Step::Months(months) => start.checked_add_months(Months::new(months.checked_mul(n)?)),
            Step::Cycle(offsets) => {
                let len = u32::try_from(offsets.len()).ok()?;
                let period = cycle_period(offsets);
                let whole = period.num_milliseconds().checked_mul(i64::from(n / len))?;
                let partial: Duration = offsets[..(n % len) as usize].iter().copied().sum();
                start
                    .checked_add_signed(Duration::milliseconds(whole))?
                    .checked_add_signed(partial)
            }
            Step::OrdinalWeekday {
                months,
                ordinal,
                weekday,
            } => {
                let anchor = first_of_month(start.date())?.checked_add_months(Months::new(months.checked_mul(n)?))?;
                let date = ordinal_date(anchor.year(), anchor.month(), *ordinal, *weekday)?;
                Some(date.and_time(start.time()))
            }
        }
    }

    /// Last candidate not later than `target`, found arithmetically, with its cycle index.
    ///
    /// Returns `start` when `target` is not after it.
    fn jump(&self, start: NaiveDateTime, target: NaiveDateTime) -> Option<(NaiveDateTime, usize)> {
        if target <= start {
            return Some((start, 0));
        }
        match self {
            Step::Fixed(step) => {
                let elapsed = (target - start).num_milliseconds();
                let periods = elapsed / step.num_milliseconds();
                let ms = step.num_milliseconds().checked_mul(periods)?;
                Some((start.checked_add_signed(Duration::milliseconds(ms))?, 0))
            }
            Step::Months(months) | Step::OrdinalWeekday { months, .. } => {
                let elapsed = months_between(start.date(), target.date());
                let periods = u32::try_from(elapsed / i64::from(*months)).ok()?;
                Some((self.nth(start, periods)?, 0))
            }
            Step::Cycle(offsets) => {
                let period = cycle_period(offsets).num_days();
                let periods = (target - start).num_days() / period;
                let days = periods.checked_mul(period)?;
                Some((start.checked_add_signed(Duration::days(days))?, 0))
            }
        }
    }
}

fn cycle_period(offsets: &[Duration]) -> Duration {
    offsets.iter().copied().sum()
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    u32::try_from((next - first).num_days()).ok()
}

/// Date of the `ordinal`-th `weekday` in a month; negative ordinals count from the end.
pub(crate) fn ordinal_date(year: i32, month: u32, ordinal: i8, weekday: Weekday) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let length = i64::from(days_in_month(year, month)?);
    let first_weekday = i64::from(first.weekday().num_days_from_monday());
    let target = i64::from(weekday.num_days_from_monday());
    let ordinal = i64::from(ordinal);

    let day = if ordinal > 0 {
        1 + (target - first_weekday).rem_euclid(7) + (ordinal - 1) * 7
    } else if ordinal < 0 {
        let last_weekday = (first_weekday + length - 1) % 7;
        let back = (target - last_weekday).rem_euclid(7);
        let last = if back != 0 { length + back - 7 } else { length };
        last + (ordinal + 1) * 7
    } else {
        return None;
    };

    if day < 1 || day > length {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, u32::try_from(day).ok()?)
}

pub(crate) fn next_ordinal(at: NaiveDateTime, months: u32, ordinal: i8, weekday: Weekday) -> Option<NaiveDateTime> {
    let anchor = first_of_month(at.date())?.checked_add_months(Months::new(months))?;
    let date = ordinal_date(anchor.year(), anchor.month(), ordinal, weekday)?;
    Some(date.and_time(at.time()))
}

/// A recurring entry prepared for analytic expansion over one window.
#[derive(Debug, Clone)]
pub struct RecurrenceDescriptor {
    pub(crate) frame: Frame,
    pub(crate) step: Step,
    pub(crate) exclusions: ExclusionSet,
    /// First occurrence at or after the window start, if any precedes the stop
    pub(crate) first: Option<NaiveDateTime>,
    pub(crate) cycle_index: usize,
    pub(crate) exclusive_stop: DateTime<Utc>,
}

impl RecurrenceDescriptor {
    /// Builds the descriptor for `entry` over `window`.
    ///
    /// # Returns
    /// * `Ok(descriptor)` - the entry can be expanded by the fast path
    /// * `Err(PatternSignal::Unsupported)` - the generic expander must be used
    /// * `Err(PatternSignal::Impossible)` - the entry never occurs
    /// * `Err(PatternSignal::Fatal)` - malformed rule or caller error
    ///
    /// # Behavior
    /// - Classify the rule and derive the step per frequency
    /// - Check that the start satisfies the derived rule
    /// - Resolve COUNT or UNTIL and the window stop into one exclusive stop
    /// - Jump to the first occurrence at or after the window start
    pub fn build(entry: &RecurringEntry, window: &QueryWindow) -> Result<Self, PatternSignal> {
        window.validate()?;
        let rule = &entry.rule;
        rule.validate()?;

        let frame = Frame::for_entry(entry, window);
        let start = frame.start_naive(&entry.start);
        let step = classify(rule, start)?;
        let exclusions = ExclusionSet::new(&frame, &entry.exdates);

        let terminator = terminator_key(rule, &frame, &step, start, &exclusions)?;
        let stop = window.stop.map(|bound| frame.bound_key(&bound));
        let exclusive_stop = match (terminator, stop) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => {
                return Err(RecurrenceError::CallerContractViolation(
                    "unbounded rule queried without a stop".to_string(),
                )
                .into())
            }
        };

        let lower = window.start.map(|bound| frame.bound_key(&bound));
        let target = lower.map_or(start, |key| frame.naive(key));
        let (mut at, mut index) = step
            .jump(start, target)
            .ok_or_else(|| PatternSignal::unsupported("date arithmetic overflow"))?;

        let first = loop {
            let key = frame.key(at);
            if key >= exclusive_stop {
                break None;
            }
            if lower.map_or(true, |lower| key >= lower) && !exclusions.contains(key, at) {
                break Some(at);
            }
            match step.advance(at, &mut index) {
                Some(next) => at = next,
                None => break None,
            }
        };

        trace!(
            entry_id = %entry.id,
            frame = ?frame,
            step = ?step,
            first = ?first,
            exclusive_stop = %exclusive_stop,
            "Built recurrence descriptor"
        );

        Ok(Self {
            frame,
            step,
            exclusions,
            first,
            cycle_index: index,
            exclusive_stop,
        })
    }

    pub fn is_timed(&self) -> bool {
        self.frame.is_timed()
    }

    pub fn is_subday(&self) -> bool {
        self.frame.is_subday()
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    /// First occurrence inside the window.
    pub fn first_occurrence(&self) -> Option<Instant> {
        self.first.map(|at| self.frame.instant(self.frame.key(at)))
    }
}

fn classify(rule: &RecurrenceRule, start: NaiveDateTime) -> Result<Step, PatternSignal> {
    if let Some(part) = rule.passthrough.first() {
        return Err(PatternSignal::unsupported(format!("{} is not supported", part.name)));
    }
    if rule.by_month.len() > 1 {
        return Err(PatternSignal::unsupported("multiple BYMONTH values"));
    }
    if !rule.by_month.is_empty() && rule.frequency != Frequency::Yearly {
        return Err(PatternSignal::unsupported("BYMONTH on a non-yearly rule"));
    }
    if rule.by_month.first().is_some_and(|month| *month != start.month()) {
        return Err(PatternSignal::unsupported("BYMONTH differs from the start month"));
    }
    if !rule.by_month_day.is_empty() {
        let matches_start = rule.frequency == Frequency::Yearly
            && rule.by_month.len() == 1
            && rule.by_day.is_empty()
            && rule.by_month_day.len() == 1
            && u32::try_from(rule.by_month_day[0]).ok() == Some(start.day());
        if !matches_start {
            return Err(PatternSignal::unsupported("BYMONTHDAY"));
        }
    }
    if !rule.by_day.is_empty()
        && !matches!(
            rule.frequency,
            Frequency::Yearly | Frequency::Monthly | Frequency::Weekly
        )
    {
        return Err(PatternSignal::unsupported(format!(
            "BYDAY on a {} rule",
            rule.frequency
        )));
    }

    let interval = rule.interval;
    let n = i64::from(interval);
    match rule.frequency {
        Frequency::Yearly => {
            let months = interval
                .checked_mul(12)
                .ok_or_else(|| PatternSignal::unsupported("interval too large"))?;
            if rule.by_day.is_empty() {
                if start.month() == 2 && start.day() == 29 {
                    return Err(PatternSignal::unsupported("yearly rule starting on February 29"));
                }
                Ok(Step::Months(months))
            } else if rule.by_month.len() != 1 {
                Err(PatternSignal::unsupported("yearly BYDAY without BYMONTH"))
            } else {
                ordinal_step(rule, months, start.date())
            }
        }
        Frequency::Monthly => {
            if rule.by_day.is_empty() {
                if start.day() > 28 {
                    return Err(PatternSignal::unsupported("monthly rule after day 28"));
                }
                Ok(Step::Months(interval))
            } else {
                ordinal_step(rule, interval, start.date())
            }
        }
        Frequency::Weekly => weekly_step(rule, start.date()),
        Frequency::Daily => Ok(Step::Fixed(Duration::days(n))),
        Frequency::Hourly => Ok(Step::Fixed(Duration::hours(n))),
        Frequency::Minutely => Ok(Step::Fixed(Duration::minutes(n))),
        Frequency::Secondly => Ok(Step::Fixed(Duration::seconds(n))),
    }
}

fn ordinal_step(rule: &RecurrenceRule, months: u32, start: NaiveDate) -> Result<Step, PatternSignal> {
    let [token] = rule.by_day.as_slice() else {
        return Err(PatternSignal::unsupported("multiple BYDAY values"));
    };
    let Some(ordinal) = token.ordinal else {
        return Err(PatternSignal::unsupported("BYDAY without ordinal"));
    };
    match ordinal.unsigned_abs() {
        0 | 6..=u8::MAX => return Err(PatternSignal::Impossible),
        5 => return Err(PatternSignal::unsupported("fifth weekday of month")),
        _ => {}
    }
    if ordinal_date(start.year(), start.month(), ordinal, token.weekday) != Some(start) {
        return Err(PatternSignal::unsupported("start is not on the BYDAY weekday"));
    }
    Ok(Step::OrdinalWeekday {
        months,
        ordinal,
        weekday: token.weekday,
    })
}

fn weekly_step(rule: &RecurrenceRule, start: NaiveDate) -> Result<Step, PatternSignal> {
    let interval = i64::from(rule.interval);
    let week = Duration::weeks(interval);
    if rule.by_day.iter().any(|token| token.ordinal.is_some()) {
        return Err(PatternSignal::unsupported("ordinal BYDAY on a weekly rule"));
    }

    let mask = rule
        .by_day
        .iter()
        .fold(0u8, |mask, token| mask | 1 << token.weekday.num_days_from_monday());
    let first = start.weekday().num_days_from_monday();
    if mask == 0 || mask == 1 << first {
        return Ok(Step::Fixed(week));
    }
    if mask & (1 << first) == 0 {
        return Err(PatternSignal::unsupported("start weekday not in BYDAY"));
    }

    let week_start = rule.week_start.unwrap_or(Weekday::Mon).num_days_from_monday();
    let mut offsets = Vec::new();
    let mut day = first;
    let mut gap = 0i64;
    for _ in 0..7 {
        day = (day + 1) % 7;
        gap += 1;
        if interval > 1 && day == week_start {
            gap += 7 * (interval - 1);
        }
        if mask & (1 << day) != 0 {
            offsets.push(Duration::days(gap));
            gap = 0;
        }
    }
    Ok(Step::Cycle(offsets))
}

/// Exclusive key implied by COUNT or UNTIL.
fn terminator_key(
    rule: &RecurrenceRule,
    frame: &Frame,
    step: &Step,
    start: NaiveDateTime,
    exclusions: &ExclusionSet,
) -> Result<Option<DateTime<Utc>>, PatternSignal> {
    let inclusive = match &rule.terminator {
        Terminator::Unbounded => return Ok(None),
        Terminator::Until(until) => frame.until_key(until),
        Terminator::Count(count) => {
            if *count == 1 && exclusions.contains(frame.key(start), start) {
                return Err(PatternSignal::Impossible);
            }
            if !exclusions.is_empty() {
                return Err(PatternSignal::unsupported("COUNT with exception dates"));
            }
            let last = step
                .nth(start, count - 1)
                .ok_or_else(|| PatternSignal::unsupported("date arithmetic overflow"))?;
            frame.key(last)
        }
    };
    inclusive
        .checked_add_signed(Duration::milliseconds(1))
        .map(Some)
        .ok_or_else(|| PatternSignal::unsupported("date arithmetic overflow"))
}
