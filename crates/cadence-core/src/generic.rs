use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rrule::{RRule, RRuleSet, Tz as RRuleTz, Unvalidated};
use tracing::{trace, warn};

use crate::descriptor::{ExclusionSet, Frame};
use crate::error::RecurrenceError;
use crate::models::{Instant, QueryWindow, RecurringEntry};
use crate::rule::Terminator;
use crate::timezone::localize;

/// Expands any rule through the `rrule` interpreter.
///
/// Used when the descriptor rejects a rule, and as the reference the fast path
/// is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericExpander {
    /// Maximum number of dates requested from the interpreter per call
    limit: u16,
}

impl Default for GenericExpander {
    fn default() -> Self {
        Self { limit: u16::MAX }
    }
}

impl GenericExpander {
    pub fn new(limit: u16) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u16 {
        self.limit
    }

    /// Generates the occurrences of `entry` inside `window`.
    ///
    /// # Arguments
    /// * `entry` - The recurring entry to expand
    /// * `window` - Half-open query range
    ///
    /// # Returns
    /// * `Result<Vec<Instant>, RecurrenceError>` - Increasing occurrences or error
    ///
    /// # Behavior
    /// - Build the `rrule` set from the RRULE text and the start as a concrete instant
    /// - Bound the set slightly wider than the window, then filter exactly
    /// - Map results back through the entry's frame so ambiguous local times
    ///   follow the start's fold
    /// - Remove exception dates by instant, and by date for timed daily-or-longer rules
    pub fn expand(
        &self,
        entry: &RecurringEntry,
        window: &QueryWindow,
    ) -> Result<Vec<Instant>, RecurrenceError> {
        window.validate()?;
        entry.rule.validate()?;

        let frame = Frame::for_entry(entry, window);
        let start = frame.start_naive(&entry.start);
        let start_key = frame.key(start);
        let lower = window.start.map(|bound| frame.bound_key(&bound));
        let upper = window.stop.map(|bound| frame.bound_key(&bound));

        if upper.is_none() && entry.rule.terminator == Terminator::Unbounded {
            return Err(RecurrenceError::CallerContractViolation(
                "unbounded rule queried without a stop".to_string(),
            ));
        }
        if let Terminator::Until(until) = &entry.rule.terminator {
            if frame.until_key(until) < start_key {
                return Ok(Vec::new());
            }
        }
        if let (Some(lower), Some(upper)) = (lower, upper) {
            if lower >= upper {
                return Ok(Vec::new());
            }
        }

        let slack = bound_slack(&frame);
        let rrule_set = self.rrule_set(entry, &frame, start)?;
        let rrule_set = match lower {
            Some(lower) => rrule_set.after(widen(lower, -slack).with_timezone(&RRuleTz::UTC)),
            None => rrule_set,
        };
        let rrule_set = match upper {
            Some(upper) => rrule_set.before(widen(upper, slack).with_timezone(&RRuleTz::UTC)),
            None => rrule_set,
        };

        let result = rrule_set.all(self.limit);
        if result.limited {
            warn!(
                entry_id = %entry.id,
                limit = self.limit,
                "Recurrence interpreter hit its result limit; occurrences truncated"
            );
        }

        let exclusions = ExclusionSet::new(&frame, &entry.exdates);
        let mut keys: Vec<DateTime<Utc>> = result
            .dates
            .into_iter()
            .map(|dt| resolve(&frame, dt))
            .collect();
        keys.sort_unstable();
        keys.dedup();

        let occurrences: Vec<Instant> = keys
            .into_iter()
            .filter(|key| lower.map_or(true, |lower| *key >= lower))
            .filter(|key| upper.map_or(true, |upper| *key < upper))
            .filter(|key| !exclusions.contains(*key, frame.naive(*key)))
            .map(|key| frame.instant(key))
            .collect();

        trace!(entry_id = %entry.id, count = occurrences.len(), "Expanded with generic interpreter");
        Ok(occurrences)
    }

    /// First occurrence on or after the entry's start, ignoring exception dates.
    ///
    /// `None` when the rule produces nothing, e.g. an UNTIL before the start.
    pub fn first_occurrence(&self, entry: &RecurringEntry) -> Result<Option<Instant>, RecurrenceError> {
        entry.rule.validate()?;

        let zone = match entry.start {
            Instant::Timed(dt) => dt.timezone(),
            Instant::Date(_) => chrono_tz::Tz::UTC,
        };
        let frame = Frame::for_entry(entry, &QueryWindow::unbounded(zone));
        let start = frame.start_naive(&entry.start);
        if let Terminator::Until(until) = &entry.rule.terminator {
            if frame.until_key(until) < frame.key(start) {
                return Ok(None);
            }
        }

        let result = self.rrule_set(entry, &frame, start)?.all(1);
        Ok(result
            .dates
            .into_iter()
            .next()
            .map(|dt| frame.instant(resolve(&frame, dt))))
    }

    fn rrule_set(
        &self,
        entry: &RecurringEntry,
        frame: &Frame,
        start: NaiveDateTime,
    ) -> Result<RRuleSet, RecurrenceError> {
        let text = rule_text(entry, frame);
        let rrule = text
            .parse::<RRule<Unvalidated>>()
            .map_err(|e| RecurrenceError::InvalidRule(format!("Failed to parse RRULE '{}': {}", text, e)))?;
        rrule
            .build(dt_start(frame, start))
            .map_err(|e| RecurrenceError::InvalidRule(format!("Invalid RRULE '{}': {}", text, e)))
    }
}

/// RRULE text for the interpreter, with UNTIL given in UTC.
fn rule_text(entry: &RecurringEntry, frame: &Frame) -> String {
    let until = match &entry.rule.terminator {
        Terminator::Until(until) => Some(frame.until_key(until).format("%Y%m%dT%H%M%SZ").to_string()),
        _ => None,
    };
    entry.rule.render(until.as_deref())
}

/// DTSTART as a concrete instant.
///
/// Zoned starts use the first pass through a repeated hour so the interpreter
/// never skips the start itself; [`resolve`] restores the start's fold. Date
/// entries are expanded as if their wall time were UTC so that the interpreter
/// never sees a DST transition.
fn dt_start(frame: &Frame, start: NaiveDateTime) -> DateTime<RRuleTz> {
    match frame {
        Frame::Local(tz, _) => localize(tz, start).with_timezone(&RRuleTz::Tz(*tz)),
        Frame::DateOnly(_) | Frame::Subday(_) => start.and_utc().with_timezone(&RRuleTz::UTC),
    }
}

/// Key of an interpreter result in the entry's frame.
fn resolve(frame: &Frame, dt: DateTime<RRuleTz>) -> DateTime<Utc> {
    let key = dt.with_timezone(&Utc);
    match frame {
        Frame::Local(..) => frame.key(frame.naive(key)),
        Frame::DateOnly(_) | Frame::Subday(_) => key,
    }
}

/// Seconds the interpreter bounds are widened by before exact filtering.
fn bound_slack(frame: &Frame) -> i64 {
    match frame {
        // Results can move by a DST shift when resolved into the frame
        Frame::Local(..) => 2 * 3600 + 1,
        Frame::DateOnly(_) | Frame::Subday(_) => 1,
    }
}

fn widen(key: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    key.checked_add_signed(Duration::seconds(seconds)).unwrap_or(key)
}
