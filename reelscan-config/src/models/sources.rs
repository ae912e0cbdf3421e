use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

pub const ENV_MAX_CONCURRENT_JOBS: &str = "REELSCAN_MAX_CONCURRENT_JOBS";
pub const ENV_HASH_BUFFER_BYTES: &str = "REELSCAN_HASH_BUFFER_BYTES";
pub const ENV_SKIP_HIDDEN: &str = "REELSCAN_SKIP_HIDDEN";
pub const ENV_LEDGER_PATH: &str = "REELSCAN_LEDGER_PATH";
pub const ENV_LOG_FILTER: &str = "REELSCAN_LOG";

/// Per-knob overrides gathered from `REELSCAN_*` variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub max_concurrent_jobs: Option<usize>,
    pub hash_buffer_bytes: Option<usize>,
    pub skip_hidden: Option<bool>,
    pub ledger_path: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl EnvOverrides {
    pub fn gather() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        Ok(Self {
            max_concurrent_jobs: parse(ENV_MAX_CONCURRENT_JOBS, value(ENV_MAX_CONCURRENT_JOBS))?,
            hash_buffer_bytes: parse(ENV_HASH_BUFFER_BYTES, value(ENV_HASH_BUFFER_BYTES))?,
            skip_hidden: value(ENV_SKIP_HIDDEN)
                .map(|raw| parse_bool(ENV_SKIP_HIDDEN, &raw))
                .transpose()?,
            ledger_path: value(ENV_LEDGER_PATH).map(PathBuf::from),
            log_filter: value(ENV_LOG_FILTER),
        })
    }
}

fn parse<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError> {
    raw.map(|raw| {
        raw.parse::<T>()
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw.clone() })
    })
    .transpose()
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: raw.to_string(),
        }),
    }
}
