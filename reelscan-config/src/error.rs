use std::path::PathBuf;

use thiserror::Error;

/// Settings that would make the scanner unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("scan.max_concurrent_jobs must be at least 1")]
    NoJobConcurrency,
    #[error("scan.hash_buffer_bytes must be at least 1")]
    EmptyHashBuffer,
    #[error("scan.{field} must list at least one extension")]
    NoExtensions { field: &'static str },
    #[error(
        "extension {extension:?} is listed in both scan.video_extensions and scan.subtitle_extensions"
    )]
    OverlappingExtensions { extension: String },
    #[error("logging.filter must not be empty")]
    EmptyLogFilter,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} does not exist")]
    MissingConfig { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {origin}: {message}")]
    Parse { origin: String, message: String },
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("failed to load env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
}
