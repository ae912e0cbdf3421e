//! Configuration for Reelscan.
//!
//! Scanner settings come from, in order: an explicit file, the
//! `REELSCAN_CONFIG_PATH` / `REELSCAN_CONFIG_JSON` variables, a
//! `reelscan.toml` next to the working directory, then built-in defaults.
//! Individual knobs can still be overridden through `REELSCAN_*` variables,
//! and a `.env` file is honoured when present.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigGuardRailError};
pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions};
pub use models::scanner::{
    LedgerConfig, LoggingConfig, ScannerConfig, ScannerConfigSource,
};
pub use models::sources::EnvOverrides;
