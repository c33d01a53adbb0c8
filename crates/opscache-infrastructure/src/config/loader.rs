//! Configuration loader
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults (`AppConfig::default()`)
//! 2. a TOML file: the explicit path, or the first `opscache.toml` found in
//!    the working directory, `./opscache/`, or the user config directory
//! 3. environment variables, `OPSCACHE__CACHE__LOCAL__MAX_ENTRIES=500` style
//!
//! The merged result is validated before it is returned.

use crate::config::AppConfig;
use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME,
};
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use opscache_domain::error::{Error, Result};
use opscache_domain::value_objects::DataType;
use std::path::{Path, PathBuf};

/// Loads [`AppConfig`] from defaults, a TOML file and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader with file discovery and the `OPSCACHE` prefix
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Read this file instead of discovering one
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use `prefix__` instead of `OPSCACHE__` for environment variables
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Explicit file path, if one was set
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Merge every layer, extract and validate
    pub fn load(&self) -> Result<AppConfig> {
        let config: AppConfig = self
            .figment()
            .extract()
            .config_context("Failed to extract configuration")?;

        validate_app_config(&config)?;
        Ok(config)
    }

    /// Write `config` as pretty TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let rendered =
            toml::to_string_pretty(config).config_context("Failed to render config as TOML")?;
        std::fs::write(path.as_ref(), rendered).config_context(format!(
            "Failed to write config file {}",
            path.as_ref().display()
        ))
    }

    fn figment(&self) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        match self.config_file() {
            Some(path) if path.exists() => {
                log_config_loaded(&path, true);
                figment = figment.merge(Toml::file(path));
            }
            Some(path) => log_config_loaded(&path, false),
            None => {}
        }

        let prefix = format!("{}{CONFIG_ENV_SEPARATOR}", self.env_prefix);
        figment.merge(Env::prefixed(&prefix).split(CONFIG_ENV_SEPARATOR))
    }

    /// The explicit path, else the first default location that exists
    fn config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }

        let cwd = std::env::current_dir().ok();
        [
            cwd.as_ref().map(|dir| dir.join(DEFAULT_CONFIG_FILENAME)),
            cwd.as_ref()
                .map(|dir| dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME)),
            dirs::config_dir().map(|dir| dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME)),
        ]
        .into_iter()
        .flatten()
        .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject configurations the cache cannot run with
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    parse_log_level(&config.logging.level)?;

    let cache = &config.cache;
    if !cache.enabled {
        return Ok(());
    }

    if cache.local.max_entries == 0 {
        return Err(Error::configuration(
            "cache.local.max_entries must be greater than 0 when the cache is enabled",
        ));
    }

    if let Some(distributed) = &cache.distributed {
        if distributed.timeout_ms == 0 {
            return Err(Error::configuration(
                "cache.distributed.timeout_ms must be greater than 0",
            ));
        }
        let missing_uri = distributed.uri.as_deref().is_none_or(str::is_empty);
        if distributed.provider == "redis" && missing_uri {
            return Err(Error::configuration(
                "cache.distributed.uri is required for the redis provider",
            ));
        }
    }

    if cache.default_policy.levels.is_empty() {
        return Err(Error::configuration(
            "cache.default_policy must name at least one tier",
        ));
    }
    match cache
        .policies
        .iter()
        .find(|(_, policy)| policy.levels.is_empty())
    {
        Some((data_type, _)) => Err(empty_policy(data_type)),
        None => Ok(()),
    }
}

fn empty_policy(data_type: &DataType) -> Error {
    Error::configuration(format!(
        "cache.policies.{data_type} must name at least one tier"
    ))
}
