//! Layered YAML configuration.
//!
//! Loads `config.yaml` (or an explicit path), interpolating `${VAR}` and
//! `${VAR:-default}` references against the process environment before
//! handing the result to `serde_yaml_bw`. Every field has a default, so a
//! missing file section — or a missing file entirely when the caller uses
//! [`Config::default`] — still produces a valid, runnable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root configuration object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP/gRPC listener ports.
    pub server: ServerConfig,
    /// Worker-pool sizing, mirrored onto `WorkerManagerConfig` at startup.
    pub worker_pool: WorkerPoolConfig,
    /// Market-data client settings.
    pub market_data: MarketDataConfig,
    /// Order-lifecycle settings (expiry sweep).
    pub orders: OrdersConfig,
    /// Deployment environment.
    pub environment: EnvironmentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            worker_pool: WorkerPoolConfig::default(),
            market_data: MarketDataConfig::default(),
            orders: OrdersConfig::default(),
            environment: EnvironmentConfig::default(),
        }
    }
}

/// HTTP/gRPC listener configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener port.
    pub http_port: u16,
    /// gRPC listener port.
    pub grpc_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { http_port: 8080, grpc_port: 8081 }
    }
}

/// Worker-pool sizing, mirroring `WorkerManagerConfig`'s own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Floor the pool never scales below.
    pub min_workers: usize,
    /// Ceiling the pool never scales above.
    pub max_workers: usize,
    /// Workers started at pool creation.
    pub default_workers: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { min_workers: 1, max_workers: 10, default_workers: 3 }
    }
}

/// Market-data HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// Base URL of the market-data service. `None` selects the in-memory
    /// fake instead of the HTTP adapter.
    pub url: Option<String>,
    /// Request timeout in seconds, mirroring
    /// `HttpMarketDataAdapter::DEFAULT_TIMEOUT`.
    pub timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self { url: None, timeout_secs: 30 }
    }
}

impl MarketDataConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Order-lifecycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    /// Age after which a still-`Pending` order is swept and cancelled.
    pub expiry_after_secs: u64,
    /// Interval between expired-order sweeps.
    pub expiry_sweep_interval_secs: u64,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self { expiry_after_secs: 24 * 3600, expiry_sweep_interval_secs: 3600 }
    }
}

impl OrdersConfig {
    /// Expiry age as a [`Duration`].
    #[must_use]
    pub const fn expiry_after(&self) -> Duration {
        Duration::from_secs(self.expiry_after_secs)
    }

    /// Sweep interval as a [`Duration`].
    #[must_use]
    pub const fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_secs)
    }
}

/// Deployment environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Environment name (e.g. `PRODUCTION`, `STAGING`, `DEV`).
    pub mode: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self { mode: "DEV".to_string() }
    }
}

/// Error loading or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The YAML could not be parsed into [`Config`].
    #[error("failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),
    /// A referenced environment variable had no value and no default.
    #[error("environment variable '{0}' is not set and has no default")]
    MissingEnvVar(String),
    /// A parsed value failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Load configuration from a YAML file with environment-variable
/// interpolation.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or
/// validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError { path: path.to_string(), source: e })?;
    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (used directly by tests, and by
/// [`load_config`] after reading the file from disk).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml)?;
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.worker_pool.min_workers == 0 {
        return Err(ConfigError::Invalid("worker_pool.min_workers must be at least 1".to_string()));
    }
    if config.worker_pool.max_workers < config.worker_pool.min_workers {
        return Err(ConfigError::Invalid("worker_pool.max_workers must be >= min_workers".to_string()));
    }
    if config.server.http_port == config.server.grpc_port {
        return Err(ConfigError::Invalid("server.http_port and server.grpc_port must differ".to_string()));
    }
    Ok(())
}

/// Replace `${VAR}` and `${VAR:-default}` references with values from the
/// process environment, failing on an unset variable with no default.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let pattern = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}").expect("static pattern is valid");
    let mut err = None;
    let result = pattern.replace_all(input, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => match caps.get(3) {
                Some(default) => default.as_str().to_string(),
                None => {
                    err = Some(ConfigError::MissingEnvVar(name.to_string()));
                    String::new()
                }
            },
        }
    });

    match err {
        Some(e) => Err(e),
        None => Ok(result.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn loads_minimal_yaml_with_defaults_filled_in() {
        let config = load_config_from_string("server:\n  http_port: 9000\n").unwrap();
        assert_eq!(config.server.http_port, 9000);
        assert_eq!(config.server.grpc_port, 8081);
        assert_eq!(config.worker_pool.min_workers, 1);
    }

    #[test]
    #[allow(unsafe_code)]
    fn interpolates_env_var_with_default() {
        unsafe {
            std::env::remove_var("OMS_TEST_UNSET_PORT");
        }
        let config = load_config_from_string("server:\n  http_port: ${OMS_TEST_UNSET_PORT:-7000}\n").unwrap();
        assert_eq!(config.server.http_port, 7000);
    }

    #[test]
    #[allow(unsafe_code)]
    fn interpolates_env_var_override() {
        unsafe {
            std::env::set_var("OMS_TEST_PORT", "6000");
        }
        let config = load_config_from_string("server:\n  http_port: ${OMS_TEST_PORT:-7000}\n").unwrap();
        assert_eq!(config.server.http_port, 6000);
        unsafe {
            std::env::remove_var("OMS_TEST_PORT");
        }
    }

    #[test]
    #[allow(unsafe_code)]
    fn missing_env_var_without_default_is_an_error() {
        unsafe {
            std::env::remove_var("OMS_TEST_MISSING");
        }
        let result = load_config_from_string("server:\n  http_port: ${OMS_TEST_MISSING}\n");
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "OMS_TEST_MISSING"));
    }

    #[test]
    fn rejects_inverted_worker_bounds() {
        let yaml = "worker_pool:\n  min_workers: 5\n  max_workers: 2\n  default_workers: 3\n";
        let result = load_config_from_string(yaml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_config_reads_from_a_real_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"server:\n  http_port: 9100\n  grpc_port: 9101\n").unwrap();
        let config = load_config(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.server.http_port, 9100);
        assert_eq!(config.server.grpc_port, 9101);
    }

    #[test]
    fn load_config_reports_missing_file() {
        let result = load_config(Some("/nonexistent/path/oms-config-test.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
