//! Infrastructure layer constants
//!
//! Contains constants that are part of the infrastructure implementation.
//! Domain-specific constants are defined in `opscache_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "opscache.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "opscache";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "OPSCACHE";

/// Separator between nested keys in environment variable names
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// CACHE CONSTANTS
// ============================================================================

/// Default key prefix for keys built by the codec
pub const CACHE_DEFAULT_KEY_PREFIX: &str = "opscache";

/// Default maximum number of entries in the local tier
pub const LOCAL_CACHE_DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Default interval of the local expiry sweep in seconds (0 disables it)
pub const LOCAL_CACHE_DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Backend name reported by the local tier
pub const LOCAL_CACHE_BACKEND_NAME: &str = "moka";

/// Key read by the local tier health probe
pub const LOCAL_CACHE_PROBE_KEY: &str = "__opscache_health_probe__";

/// Default timeout for a single distributed tier call in milliseconds
pub const DISTRIBUTED_CACHE_DEFAULT_TIMEOUT_MS: u64 = 500;

// ============================================================================
// POLICY CONSTANTS
// ============================================================================

/// API responses (5 minutes)
pub const API_RESPONSE_TTL_SECS: u64 = 300;

/// Expensive computation results (1 hour)
pub const COMPUTED_RESULT_TTL_SECS: u64 = 3600;

/// Session state (30 minutes)
pub const SESSION_DATA_TTL_SECS: u64 = 1800;

/// Dashboard panels (1 minute)
pub const DASHBOARD_TTL_SECS: u64 = 60;

/// RBAC decisions (5 minutes)
pub const RBAC_DECISION_TTL_SECS: u64 = 300;

/// Prometheus query results (30 seconds)
pub const PROMETHEUS_QUERY_TTL_SECS: u64 = 30;

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the log filter
pub const LOG_FILTER_ENV: &str = "OPSCACHE_LOG";

/// Log file name stem when the configured path has none
pub const DEFAULT_LOG_FILE_STEM: &str = "opscache";
