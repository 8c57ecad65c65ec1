//! RFC 5545 recurrence rules.
//!
//! Only the parts a calendar editor produces are modelled field by field
//! (FREQ, INTERVAL, COUNT, UNTIL, BYDAY, BYMONTH, BYMONTHDAY, WKST). Every other
//! part is kept verbatim in [`RecurrenceRule::passthrough`] so the descriptor can
//! refuse it and the generic expander can still hand it to the interpreter.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use std::fmt;
use std::str::FromStr;

use crate::error::{ParseRuleError, RecurrenceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

impl Frequency {
    /// Hourly, minutely and secondly repeats step in UTC.
    pub fn is_subday(self) -> bool {
        matches!(self, Frequency::Hourly | Frequency::Minutely | Frequency::Secondly)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Yearly => "YEARLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Daily => "DAILY",
            Frequency::Hourly => "HOURLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Secondly => "SECONDLY",
        };
        f.write_str(name)
    }
}

impl FromStr for Frequency {
    type Err = ParseRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "YEARLY" => Ok(Frequency::Yearly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "WEEKLY" => Ok(Frequency::Weekly),
            "DAILY" => Ok(Frequency::Daily),
            "HOURLY" => Ok(Frequency::Hourly),
            "MINUTELY" => Ok(Frequency::Minutely),
            "SECONDLY" => Ok(Frequency::Secondly),
            _ => Err(invalid("FREQ", s)),
        }
    }
}

/// The value of an UNTIL part. RFC 5545 treats it as inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleUntil {
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    /// Local time in the zone of the entry's start
    Floating(NaiveDateTime),
}

impl fmt::Display for RuleUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleUntil::Date(date) => write!(f, "{}", date.format("%Y%m%d")),
            RuleUntil::Utc(dt) => write!(f, "{}", dt.format("%Y%m%dT%H%M%SZ")),
            RuleUntil::Floating(dt) => write!(f, "{}", dt.format("%Y%m%dT%H%M%S")),
        }
    }
}

impl FromStr for RuleUntil {
    type Err = ParseRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 8 {
            return NaiveDate::parse_from_str(s, "%Y%m%d")
                .map(RuleUntil::Date)
                .map_err(|_| invalid("UNTIL", s));
        }
        if let Some(utc) = s.strip_suffix('Z') {
            return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                .map(|dt| RuleUntil::Utc(dt.and_utc()))
                .map_err(|_| invalid("UNTIL", s));
        }
        NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
            .map(RuleUntil::Floating)
            .map_err(|_| invalid("UNTIL", s))
    }
}

/// How a series ends. COUNT and UNTIL cannot both be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminator {
    #[default]
    Unbounded,
    Count(u32),
    Until(RuleUntil),
}

/// One BYDAY token, e.g. `MO` or `-1SU`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    pub fn every(weekday: Weekday) -> Self {
        Self { ordinal: None, weekday }
    }

    pub fn nth(ordinal: i8, weekday: Weekday) -> Self {
        Self { ordinal: Some(ordinal), weekday }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ordinal) = self.ordinal {
            write!(f, "{}", ordinal)?;
        }
        f.write_str(weekday_code(self.weekday))
    }
}

impl FromStr for WeekdayNum {
    type Err = ParseRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || s.len() < 2 {
            return Err(invalid("BYDAY", s));
        }
        let (prefix, code) = s.split_at(s.len() - 2);
        let weekday = parse_weekday(code).ok_or_else(|| invalid("BYDAY", s))?;
        let ordinal = if prefix.is_empty() {
            None
        } else {
            let n: i8 = prefix.parse().map_err(|_| invalid("BYDAY", s))?;
            if n.unsigned_abs() > 53 {
                return Err(invalid("BYDAY", s));
            }
            Some(n)
        };
        Ok(Self { ordinal, weekday })
    }
}

/// A rule part the engine does not model, kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePart {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub terminator: Terminator,
    pub by_day: Vec<WeekdayNum>,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i8>,
    pub week_start: Option<Weekday>,
    /// BYSETPOS, BYHOUR, BYWEEKNO, X-names and anything else
    pub passthrough: Vec<RulePart>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            terminator: Terminator::Unbounded,
            by_day: Vec::new(),
            by_month: Vec::new(),
            by_month_day: Vec::new(),
            week_start: None,
            passthrough: Vec::new(),
        }
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.terminator = Terminator::Count(count);
        self
    }

    pub fn until(mut self, until: RuleUntil) -> Self {
        self.terminator = Terminator::Until(until);
        self
    }

    pub fn by_day(mut self, by_day: Vec<WeekdayNum>) -> Self {
        self.by_day = by_day;
        self
    }

    pub fn by_month(mut self, by_month: Vec<u32>) -> Self {
        self.by_month = by_month;
        self
    }

    pub fn by_month_day(mut self, by_month_day: Vec<i8>) -> Self {
        self.by_month_day = by_month_day;
        self
    }

    pub fn week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = Some(week_start);
        self
    }

    /// Checks the invariants that no fallback can repair.
    pub fn validate(&self) -> Result<(), RecurrenceError> {
        if self.interval == 0 {
            return Err(RecurrenceError::InvalidRule(
                "INTERVAL must be at least 1".to_string(),
            ));
        }
        if self.terminator == Terminator::Count(0) {
            return Err(RecurrenceError::InvalidRule(
                "COUNT must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders the rule as RRULE text, optionally replacing the UNTIL value.
    pub(crate) fn render(&self, until: Option<&str>) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency)];
        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        match &self.terminator {
            Terminator::Unbounded => {}
            Terminator::Count(count) => parts.push(format!("COUNT={}", count)),
            Terminator::Until(value) => match until {
                Some(rendered) => parts.push(format!("UNTIL={}", rendered)),
                None => parts.push(format!("UNTIL={}", value)),
            },
        }
        if !self.by_day.is_empty() {
            parts.push(format!("BYDAY={}", join(&self.by_day)));
        }
        if !self.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", join(&self.by_month)));
        }
        if !self.by_month_day.is_empty() {
            parts.push(format!("BYMONTHDAY={}", join(&self.by_month_day)));
        }
        if let Some(week_start) = self.week_start {
            parts.push(format!("WKST={}", weekday_code(week_start)));
        }
        for part in &self.passthrough {
            parts.push(format!("{}={}", part.name, part.value));
        }
        parts.join(";")
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

impl FromStr for RecurrenceRule {
    type Err = ParseRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_uppercase();
        let text = text.strip_prefix("RRULE:").unwrap_or(&text);

        let mut frequency = None;
        let mut rule = RecurrenceRule::new(Frequency::Daily);
        let mut count = None;
        let mut until = None;
        let mut seen: Vec<&str> = Vec::new();

        for part in text.split(';').filter(|p| !p.is_empty()) {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| ParseRuleError::MalformedPart(part.to_string()))?;
            if seen.contains(&name) {
                return Err(ParseRuleError::DuplicatePart(name.to_string()));
            }
            seen.push(name);

            match name {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => {
                    rule.interval = value.parse().map_err(|_| invalid(name, value))?;
                }
                "COUNT" => count = Some(value.parse::<u32>().map_err(|_| invalid(name, value))?),
                "UNTIL" => until = Some(value.parse::<RuleUntil>()?),
                "BYDAY" => rule.by_day = parse_list(value, |v| v.parse::<WeekdayNum>())?,
                "BYMONTH" => {
                    rule.by_month = parse_list(value, |v| match v.parse::<u32>() {
                        Ok(m @ 1..=12) => Ok(m),
                        _ => Err(invalid(name, v)),
                    })?;
                }
                "BYMONTHDAY" => {
                    rule.by_month_day = parse_list(value, |v| match v.parse::<i8>() {
                        Ok(d) if d != 0 && d.unsigned_abs() <= 31 => Ok(d),
                        _ => Err(invalid(name, v)),
                    })?;
                }
                "WKST" => {
                    rule.week_start = Some(parse_weekday(value).ok_or_else(|| invalid(name, value))?);
                }
                _ => rule.passthrough.push(RulePart {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
            }
        }

        rule.frequency = frequency.ok_or(ParseRuleError::MissingFrequency)?;
        rule.terminator = match (count, until) {
            (Some(_), Some(_)) => return Err(ParseRuleError::CountAndUntil),
            (Some(count), None) => Terminator::Count(count),
            (None, Some(until)) => Terminator::Until(until),
            (None, None) => Terminator::Unbounded,
        };
        Ok(rule)
    }
}

pub(crate) fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

pub(crate) fn parse_weekday(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn invalid(part: &str, value: &str) -> ParseRuleError {
    ParseRuleError::InvalidValue {
        part: part.to_string(),
        value: value.to_string(),
    }
}

fn parse_list<T, F>(value: &str, parse: F) -> Result<Vec<T>, ParseRuleError>
where
    F: Fn(&str) -> Result<T, ParseRuleError>,
{
    value.split(',').map(|v| parse(v.trim())).collect()
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
