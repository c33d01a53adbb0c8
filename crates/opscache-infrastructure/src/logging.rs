//! Structured logging with tracing
//!
//! One subscriber for the process: stdout, optionally mirrored to a
//! daily-rolling file, in plain or JSON format. `OPSCACHE_LOG` takes an
//! `EnvFilter` directive and overrides the configured level.

use crate::constants::{DEFAULT_LOG_FILE_STEM, LOG_FILTER_ENV};
use opscache_domain::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

const LEVEL_NAMES: [(&str, Level); 6] = [
    ("trace", Level::TRACE),
    ("debug", Level::DEBUG),
    ("info", Level::INFO),
    ("warn", Level::WARN),
    ("warning", Level::WARN),
    ("error", Level::ERROR),
];

/// Install the global subscriber described by `config`
///
/// Fails when the level is unknown or a global subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let mut layers = vec![stdout_layer(config.json_format)];
    if let Some(path) = &config.file_output {
        layers.push(file_layer(path, config.json_format));
    }

    Registry::default()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| {
            Error::configuration_with_source(format!("Failed to install log subscriber: {e}"), e)
        })?;

    info!(
        %level,
        json = config.json_format,
        file = ?config.file_output,
        "logging initialized"
    );
    Ok(())
}

fn stdout_layer(json: bool) -> BoxedLayer {
    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn file_layer(path: &Path, json: bool) -> BoxedLayer {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_stem()
        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE_STEM));

    let layer = fmt::layer()
        .with_writer(tracing_appender::rolling::daily(directory, stem))
        .with_ansi(false)
        .with_target(true);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Parse a level name, case-insensitively
pub fn parse_log_level(level: &str) -> Result<Level> {
    let wanted = level.trim();
    LEVEL_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
        .map(|(_, level)| *level)
        .ok_or_else(|| {
            Error::configuration(format!(
                "Unknown log level '{level}', expected trace, debug, info, warn or error"
            ))
        })
}

/// Record whether a configuration file was found
pub fn log_config_loaded(config_path: &Path, found: bool) {
    if found {
        info!(path = %config_path.display(), "configuration file loaded");
    } else {
        warn!(
            path = %config_path.display(),
            "configuration file not found, using defaults and environment"
        );
    }
}

/// Record the outcome of a health probe
pub fn log_health_check(component: &str, healthy: bool, details: Option<&str>) {
    if healthy {
        debug!(component, "health probe passed");
    } else {
        error!(
            component,
            details = details.unwrap_or("no details"),
            "health probe failed"
        );
    }
}
