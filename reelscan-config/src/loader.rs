use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;
use crate::models::scanner::{ScannerConfig, ScannerConfigSource};
use crate::models::sources::EnvOverrides;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    /// File that wins over every environment source.
    pub config_path: Option<PathBuf>,
    /// `.env` file to read instead of searching for one.
    pub env_file: Option<PathBuf>,
    /// Directory searched for the default config files.
    pub base_dir: Option<PathBuf>,
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: ScannerConfig,
    pub source: ScannerConfigSource,
    pub env_file_loaded: bool,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_base_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.base_dir = Some(path.into());
        self
    }

    /// Read `.env`, resolve the config source, apply `REELSCAN_*` overrides
    /// and validate.
    pub fn load(&self) -> Result<ConfigLoad, ConfigError> {
        let env_file_loaded = self.load_env_file()?;
        self.load_with(env_file_loaded, |key| std::env::var(key).ok())
    }

    /// [`ConfigLoader::load`] without touching `.env` or the process
    /// environment.
    pub fn load_with<F>(
        &self,
        env_file_loaded: bool,
        lookup: F,
    ) -> Result<ConfigLoad, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, source) = match &self.options.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingConfig { path: path.clone() });
                }
                (
                    ScannerConfig::load_from_file(path)?,
                    ScannerConfigSource::Explicit(path.clone()),
                )
            }
            None => {
                let base_dir = self
                    .options
                    .base_dir
                    .as_deref()
                    .unwrap_or(Path::new("."));
                ScannerConfig::load_from_vars(base_dir, &lookup)?
            }
        };

        let overrides = EnvOverrides::from_lookup(&lookup)?;
        config.apply_overrides(&overrides);
        config.validate()?;

        debug!(?source, env_file_loaded, "scanner configuration loaded");
        Ok(ConfigLoad {
            config,
            source,
            env_file_loaded,
        })
    }

    fn load_env_file(&self) -> Result<bool, ConfigError> {
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        match loaded {
            Ok(loaded) => Ok(loaded),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
