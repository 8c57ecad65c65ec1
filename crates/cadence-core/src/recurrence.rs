use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::descriptor::RecurrenceDescriptor;
use crate::error::{PatternSignal, RecurrenceError};
use crate::generic::GenericExpander;
use crate::models::{Instant, QueryWindow, RecurringEntry};

/// RecurrenceManager: answers range queries for single recurring entries.
///
/// Responsibilities:
/// 1. Build a descriptor and drain the fast path when the rule allows it
/// 2. Return nothing for rules that can never occur
/// 3. Fall back to the generic interpreter for everything else
/// 4. Optionally verify fast-path output against the interpreter
#[derive(Debug, Clone)]
pub struct RecurrenceManager {
    config: EngineConfig,
    generic: GenericExpander,
}

impl RecurrenceManager {
    pub fn new(config: EngineConfig) -> Self {
        let generic = GenericExpander::new(config.generic_limit);
        Self { config, generic }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generic(&self) -> &GenericExpander {
        &self.generic
    }

    /// Occurrences of `entry` inside `window`, in increasing order.
    ///
    /// # Arguments
    /// * `entry` - The recurring entry to expand
    /// * `window` - Half-open query range; `start > stop` is rejected
    ///
    /// # Returns
    /// * `Result<Vec<Instant>, RecurrenceError>` - Occurrences or a fatal error
    pub fn occurrences_in_range(
        &self,
        entry: &RecurringEntry,
        window: &QueryWindow,
    ) -> Result<Vec<Instant>, RecurrenceError> {
        window.validate()?;

        match RecurrenceDescriptor::build(entry, window) {
            Ok(descriptor) => {
                let fast: Vec<Instant> = descriptor.into_expander().collect();
                if cfg!(debug_assertions) && self.config.verify_fast_path {
                    return self.verify(entry, window, fast);
                }
                Ok(fast)
            }
            Err(PatternSignal::Impossible) => {
                debug!(entry_id = %entry.id, rule = %entry.rule, "Recurrence can never occur");
                Ok(Vec::new())
            }
            Err(PatternSignal::Unsupported(reason)) => {
                debug!(
                    entry_id = %entry.id,
                    rule = %entry.rule,
                    reason = %reason,
                    "Falling back to generic recurrence expansion"
                );
                self.generic.expand(entry, window)
            }
            Err(PatternSignal::Fatal(err)) => Err(err),
        }
    }

    /// Window covering whole days in the configured default zone.
    pub fn window_for_dates(&self, start: NaiveDate, stop: NaiveDate) -> Result<QueryWindow, RecurrenceError> {
        QueryWindow::dates(self.config.timezone()?, start, stop)
    }

    /// Zone date-only entries are placed in.
    pub fn default_zone(&self) -> Result<Tz, RecurrenceError> {
        self.config.timezone()
    }

    fn verify(
        &self,
        entry: &RecurringEntry,
        window: &QueryWindow,
        fast: Vec<Instant>,
    ) -> Result<Vec<Instant>, RecurrenceError> {
        let generic = match self.generic.expand(entry, window) {
            Ok(generic) => generic,
            Err(err) => {
                error!(entry_id = %entry.id, rule = %entry.rule, error = %err, "Verification expansion failed");
                return Ok(fast);
            }
        };
        if generic != fast {
            error!(
                entry_id = %entry.id,
                rule = %entry.rule,
                fast_count = fast.len(),
                generic_count = generic.len(),
                first_fast = ?fast.first(),
                first_generic = ?generic.first(),
                "Fast-path expansion diverged from the generic interpreter"
            );
            return Ok(generic);
        }
        Ok(fast)
    }
}

/// Occurrences of `entry` inside `window` with default settings.
pub fn occurrences_in_range(
    entry: &RecurringEntry,
    window: &QueryWindow,
) -> Result<Vec<Instant>, RecurrenceError> {
    RecurrenceManager::new(EngineConfig {
        default_timezone: window.zone.name().to_string(),
        verify_fast_path: false,
        generic_limit: u16::MAX,
    })
    .occurrences_in_range(entry, window)
}
