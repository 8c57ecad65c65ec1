//! Lazy producers for the rule shapes the descriptor accepts.

use chrono::{DateTime, Duration, Months, NaiveDateTime, Utc, Weekday};

use crate::descriptor::{next_ordinal, ExclusionSet, Frame, RecurrenceDescriptor, Step};
use crate::models::Instant;

/// Limits shared by every producer.
#[derive(Debug, Clone)]
struct Bounds {
    frame: Frame,
    exclusions: ExclusionSet,
    stop: DateTime<Utc>,
}

impl Bounds {
    /// Advances from `from` to the next admitted candidate before the stop.
    fn seek<F>(&self, from: NaiveDateTime, mut advance: F) -> Option<NaiveDateTime>
    where
        F: FnMut(NaiveDateTime) -> Option<NaiveDateTime>,
    {
        let mut at = from;
        loop {
            at = advance(at)?;
            let key = self.frame.key(at);
            if key >= self.stop {
                return None;
            }
            if !self.exclusions.contains(key, at) {
                return Some(at);
            }
        }
    }

    fn instant(&self, at: NaiveDateTime) -> Instant {
        self.frame.instant(self.frame.key(at))
    }
}

#[derive(Debug, Clone, Copy)]
enum Stride {
    Fixed(Duration),
    Months(u32),
}

/// Fixed duration or whole calendar months between occurrences.
#[derive(Debug, Clone)]
pub struct SimpleExpander {
    bounds: Bounds,
    stride: Stride,
    next: Option<NaiveDateTime>,
}

impl Iterator for SimpleExpander {
    type Item = Instant;

    fn next(&mut self) -> Option<Instant> {
        let current = self.next.take()?;
        let stride = self.stride;
        self.next = self.bounds.seek(current, |at| match stride {
            Stride::Fixed(step) => at.checked_add_signed(step),
            Stride::Months(months) => at.checked_add_months(Months::new(months)),
        });
        Some(self.bounds.instant(current))
    }
}

/// Weekly rule on several weekdays, cycling through day offsets.
#[derive(Debug, Clone)]
pub struct MultiDeltaExpander {
    bounds: Bounds,
    offsets: Vec<Duration>,
    index: usize,
    next: Option<NaiveDateTime>,
}

impl Iterator for MultiDeltaExpander {
    type Item = Instant;

    fn next(&mut self) -> Option<Instant> {
        let current = self.next.take()?;
        let offsets = &self.offsets;
        let index = &mut self.index;
        self.next = self.bounds.seek(current, |at| {
            let offset = offsets.get(*index)?;
            *index = (*index + 1) % offsets.len();
            at.checked_add_signed(*offset)
        });
        Some(self.bounds.instant(current))
    }
}

/// N-th weekday of every `months`-th month.
#[derive(Debug, Clone)]
pub struct OrdinalWeekdayExpander {
    bounds: Bounds,
    months: u32,
    ordinal: i8,
    weekday: Weekday,
    next: Option<NaiveDateTime>,
}

impl Iterator for OrdinalWeekdayExpander {
    type Item = Instant;

    fn next(&mut self) -> Option<Instant> {
        let current = self.next.take()?;
        let (months, ordinal, weekday) = (self.months, self.ordinal, self.weekday);
        self.next = self
            .bounds
            .seek(current, |at| next_ordinal(at, months, ordinal, weekday));
        Some(self.bounds.instant(current))
    }
}

/// Fast-path expansion of one descriptor.
///
/// Yields strictly increasing instants and is exhausted once the next
/// candidate reaches the exclusive stop.
#[derive(Debug, Clone)]
pub enum FastPathExpander {
    Simple(SimpleExpander),
    MultiDelta(MultiDeltaExpander),
    OrdinalWeekday(OrdinalWeekdayExpander),
}

impl From<RecurrenceDescriptor> for FastPathExpander {
    fn from(descriptor: RecurrenceDescriptor) -> Self {
        let bounds = Bounds {
            frame: descriptor.frame,
            exclusions: descriptor.exclusions,
            stop: descriptor.exclusive_stop,
        };
        let next = descriptor.first;
        match descriptor.step {
            Step::Fixed(step) => FastPathExpander::Simple(SimpleExpander {
                bounds,
                stride: Stride::Fixed(step),
                next,
            }),
            Step::Months(months) => FastPathExpander::Simple(SimpleExpander {
                bounds,
                stride: Stride::Months(months),
                next,
            }),
            Step::Cycle(offsets) => FastPathExpander::MultiDelta(MultiDeltaExpander {
                bounds,
                offsets,
                index: descriptor.cycle_index,
                next,
            }),
            Step::OrdinalWeekday {
                months,
                ordinal,
                weekday,
            } => FastPathExpander::OrdinalWeekday(OrdinalWeekdayExpander {
                bounds,
                months,
                ordinal,
                weekday,
                next,
            }),
        }
    }
}

impl Iterator for FastPathExpander {
    type Item = Instant;

    fn next(&mut self) -> Option<Instant> {
        match self {
            FastPathExpander::Simple(inner) => inner.next(),
            FastPathExpander::MultiDelta(inner) => inner.next(),
            FastPathExpander::OrdinalWeekday(inner) => inner.next(),
        }
    }
}

impl RecurrenceDescriptor {
    pub fn into_expander(self) -> FastPathExpander {
        FastPathExpander::from(self)
    }
}
