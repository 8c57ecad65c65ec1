use thiserror::Error;

/// Errors that reach callers of the engine.
///
/// Everything here is fatal for the entry (or query) it was raised for. The
/// recoverable outcomes of descriptor construction live in [`PatternSignal`]
/// and never leave the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Caller contract violation: {0}")]
    CallerContractViolation(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Outcome of a failed [`RecurrenceDescriptor`](crate::descriptor::RecurrenceDescriptor) build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternSignal {
    /// The rule is outside the fast-path subset; use the generic expander.
    #[error("Unsupported pattern: {0}")]
    Unsupported(String),

    /// The rule can provably never produce an occurrence.
    #[error("Pattern can never occur")]
    Impossible,

    #[error(transparent)]
    Fatal(#[from] RecurrenceError),
}

impl PatternSignal {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        PatternSignal::Unsupported(reason.into())
    }
}

/// Errors produced while parsing RRULE text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseRuleError {
    #[error("Missing FREQ in recurrence rule")]
    MissingFrequency,

    #[error("Invalid rule part '{0}'")]
    MalformedPart(String),

    #[error("Invalid value '{value}' for {part}")]
    InvalidValue { part: String, value: String },

    #[error("Duplicate rule part {0}")]
    DuplicatePart(String),

    #[error("COUNT and UNTIL are mutually exclusive")]
    CountAndUntil,
}

impl From<ParseRuleError> for RecurrenceError {
    fn from(err: ParseRuleError) -> Self {
        RecurrenceError::InvalidRule(err.to_string())
    }
}
