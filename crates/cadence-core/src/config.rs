use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::RecurrenceError;
use crate::timezone::{detect_system_timezone, parse_timezone};

/// Engine settings.
///
/// Loaded from defaults, then `cadence.toml`, then `CADENCE_`-prefixed
/// environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Zone used to place date-only entries (IANA format)
    pub default_timezone: String,
    /// Cross-check every fast-path expansion against the interpreter (debug builds only)
    pub verify_fast_path: bool,
    /// Cap on the number of dates the interpreter returns per entry
    pub generic_limit: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timezone: detect_system_timezone(),
            verify_fast_path: false,
            generic_limit: u16::MAX,
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file("cadence.toml"))
            .merge(Env::prefixed("CADENCE_"))
    }

    pub fn timezone(&self) -> Result<Tz, RecurrenceError> {
        parse_timezone(&self.default_timezone)
    }
}
