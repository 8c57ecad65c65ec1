//! # Cadence Core Library
//!
//! Recurrence expansion for calendar entries: given a repeating entry and a
//! query window, produce the concrete occurrences inside the window.
//!
//! ## Features
//!
//! - **Analytic Fast Path**: Daily, weekly, monthly and yearly rules, multi-weekday
//!   weeks and "n-th weekday of the month" rules are expanded by date arithmetic
//! - **RFC 5545 Fallback**: Everything else goes through the `rrule` interpreter
//! - **Timezone Awareness**: IANA zones with DST handling; sub-day rules step in UTC
//! - **Display Merging**: Recurring occurrences merged into sorted single entries
//!
//! ## Core Modules
//!
//! - [`rule`]: RRULE model with parsing and formatting
//! - [`models`]: Entries, instants, occurrences and query windows
//! - [`descriptor`]: Classification of rules into fast-path steps
//! - [`expander`]: Lazy fast-path producers
//! - [`generic`]: Interpreter-backed expansion
//! - [`recurrence`]: Range queries with fallback selection
//! - [`merge`]: Display list merging, ongoing entries and the entry cache
//! - [`config`]: Engine settings
//! - [`timezone`]: Timezone utilities
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     models::{QueryWindow, RecurringEntry},
//!     recurrence::RecurrenceManager,
//! };
//! use chrono::NaiveDate;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = RecurrenceManager::with_defaults();
//!     let entry = RecurringEntry::new(
//!         NaiveDate::from_ymd_opt(1942, 11, 26).unwrap(),
//!         "FREQ=YEARLY;BYMONTH=11;BYDAY=4TH".parse()?,
//!     );
//!     let window = manager.window_for_dates(
//!         NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
//!     )?;
//!
//!     for occurrence in manager.occurrences_in_range(&entry, &window)? {
//!         println!("{:?}", occurrence);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod expander;
pub mod generic;
pub mod merge;
pub mod models;
pub mod recurrence;
pub mod rule;
pub mod timezone;

pub use config::EngineConfig;
pub use descriptor::{RecurrenceDescriptor, Step};
pub use error::{ParseRuleError, PatternSignal, RecurrenceError};
pub use expander::FastPathExpander;
pub use generic::GenericExpander;
pub use merge::{EntryCache, EntrySnapshot, MergeOptions, OccurrenceMerger};
pub use models::{Instant, Occurrence, QueryWindow, RecurringEntry, SingleEntry};
pub use recurrence::{occurrences_in_range, RecurrenceManager};
pub use rule::{Frequency, RecurrenceRule, RuleUntil, Terminator, WeekdayNum};
