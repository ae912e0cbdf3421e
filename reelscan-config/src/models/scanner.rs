use reelscan_core::ScanRuntimeConfig;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use super::sources::EnvOverrides;
use crate::error::{ConfigError, ConfigGuardRailError};

pub const ENV_CONFIG_PATH: &str = "REELSCAN_CONFIG_PATH";
pub const ENV_CONFIG_JSON: &str = "REELSCAN_CONFIG_JSON";

const DEFAULT_FILE_CANDIDATES: &[&str] = &[
    "reelscan.toml",
    "reelscan.json",
    "config/reelscan.toml",
    "config/reelscan.json",
];

/// Source that produced the scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScannerConfigSource {
    #[default]
    Default,
    Explicit(PathBuf),
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Where the CLI keeps the last completed ledger between runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("reelscan-ledger.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is
    /// unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,reelscan=info".to_string(),
        }
    }
}

/// Top-level scanner settings. Every table is optional; missing keys keep
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Job concurrency, hashing buffer, extension allow-lists and progress
    /// retention.
    pub scan: ScanRuntimeConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

impl ScannerConfig {
    /// Resolve configuration from the process environment, looking for
    /// default files relative to the working directory.
    ///
    /// Evaluation order:
    /// 1) `$REELSCAN_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$REELSCAN_CONFIG_JSON` (inline JSON),
    /// 3) `reelscan.toml` / `config/reelscan.toml` (or `.json`),
    /// 4) defaults.
    pub fn load_from_env()
    -> Result<(Self, ScannerConfigSource), ConfigError> {
        Self::load_from_vars(Path::new("."), |key| std::env::var(key).ok())
    }

    /// Same as [`ScannerConfig::load_from_env`] with an injectable variable
    /// lookup and base directory.
    pub fn load_from_vars<F>(
        base_dir: &Path,
        lookup: F,
    ) -> Result<(Self, ScannerConfigSource), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = lookup(ENV_CONFIG_PATH)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str.trim());
            if !path.exists() {
                return Err(ConfigError::MissingConfig { path });
            }
            let config = Self::load_from_file(&path)?;
            return Ok((config, ScannerConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(ENV_CONFIG_JSON)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw, ENV_CONFIG_JSON)?;
            return Ok((parsed, ScannerConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(base_dir) {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ScannerConfigSource::File(path)));
        }

        Ok((Self::default(), ScannerConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let origin = path.display().to_string();

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents, &origin),
            Some("toml") | Some("tml") => toml::from_str(&contents).map_err(
                |err| ConfigError::Parse {
                    origin,
                    message: err.to_string(),
                },
            ),
            _ => Self::parse_from_str(&contents, &origin),
        }
    }

    /// Parse content of unknown format: TOML first, then JSON.
    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> Result<Self, ConfigError> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                ConfigError::Parse {
                    origin: origin.to_string(),
                    message: format!(
                        "toml error: {toml_err}; json error: {json_err}"
                    ),
                }
            })
        })
    }

    pub fn parse_json(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Parse {
            origin: origin.to_string(),
            message: err.to_string(),
        })
    }

    /// Layer `REELSCAN_*` variable overrides on top of the loaded values.
    pub fn apply_overrides(&mut self, overrides: &EnvOverrides) {
        if let Some(jobs) = overrides.max_concurrent_jobs {
            self.scan.max_concurrent_jobs = jobs;
        }
        if let Some(bytes) = overrides.hash_buffer_bytes {
            self.scan.hash_buffer_bytes = bytes;
        }
        if let Some(skip) = overrides.skip_hidden {
            self.scan.skip_hidden = skip;
        }
        if let Some(path) = &overrides.ledger_path {
            self.ledger.path = path.clone();
        }
        if let Some(filter) = &overrides.log_filter {
            self.logging.filter = filter.clone();
        }
    }

    /// Reject settings the scanner cannot run with.
    pub fn validate(&self) -> Result<(), ConfigGuardRailError> {
        if self.scan.max_concurrent_jobs == 0 {
            return Err(ConfigGuardRailError::NoJobConcurrency);
        }
        if self.scan.hash_buffer_bytes == 0 {
            return Err(ConfigGuardRailError::EmptyHashBuffer);
        }
        if !has_extension(&self.scan.video_extensions) {
            return Err(ConfigGuardRailError::NoExtensions {
                field: "video_extensions",
            });
        }
        if !has_extension(&self.scan.subtitle_extensions) {
            return Err(ConfigGuardRailError::NoExtensions {
                field: "subtitle_extensions",
            });
        }
        if let Some(extension) = shared_extension(
            &self.scan.video_extensions,
            &self.scan.subtitle_extensions,
        ) {
            return Err(ConfigGuardRailError::OverlappingExtensions { extension });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigGuardRailError::EmptyLogFilter);
        }
        Ok(())
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        DEFAULT_FILE_CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }
}

fn has_extension(extensions: &[String]) -> bool {
    extensions.iter().any(|ext| !ext.trim().is_empty())
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// First extension present in both lists, compared the way the scanner
/// matches them.
fn shared_extension(video: &[String], subtitle: &[String]) -> Option<String> {
    let video: HashSet<String> = video
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| !ext.is_empty())
        .collect();
    subtitle
        .iter()
        .map(|ext| normalize_extension(ext))
        .find(|ext| video.contains(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ScannerConfig::parse_from_str(
            "[scan]\nmax_concurrent_jobs = 3\n",
            "inline",
        )
        .unwrap();
        assert_eq!(config.scan.max_concurrent_jobs, 3);
        assert_eq!(
            config.scan.hash_buffer_bytes,
            ScanRuntimeConfig::default().hash_buffer_bytes
        );
        assert_eq!(config.ledger, LedgerConfig::default());
    }

    #[test]
    fn unknown_format_falls_back_to_json() {
        let config = ScannerConfig::parse_from_str(
            r#"{"scan": {"skip_hidden": false}}"#,
            "inline",
        )
        .unwrap();
        assert!(!config.scan.skip_hidden);
    }

    #[test]
    fn garbage_reports_both_parsers() {
        let err = ScannerConfig::parse_from_str("[[[", "inline").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("toml error"));
        assert!(message.contains("json error"));
    }

    #[test]
    fn guard_rails() {
        let mut config = ScannerConfig::default();
        assert!(config.validate().is_ok());

        config.scan.max_concurrent_jobs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigGuardRailError::NoJobConcurrency)
        );

        config.scan.max_concurrent_jobs = 2;
        config.scan.subtitle_extensions =
            vec!["srt".to_string(), ".MKV".to_string()];
        assert_eq!(
            config.validate(),
            Err(ConfigGuardRailError::OverlappingExtensions {
                extension: "mkv".to_string()
            })
        );

        config.scan.subtitle_extensions = vec![" ".to_string()];
        assert_eq!(
            config.validate(),
            Err(ConfigGuardRailError::NoExtensions {
                field: "subtitle_extensions"
            })
        );
    }
}
