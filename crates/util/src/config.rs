use std::{fmt, net::SocketAddr, time::Duration};

use url::Url;

use super::{env_var, server_bind_address};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://jobboard.db?mode=rwc";
pub const DEFAULT_JOB_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
pub const DEFAULT_JOB_API_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SSE_HEARTBEAT_SECS: u64 = 20;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_url: String,
    pub job_api_base_url: Url,
    pub job_api_timeout: Duration,
    pub sse_heartbeat: Duration,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env_var("APP_ENV").unwrap_or_else(|| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;
        let database_url =
            env_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let raw_base =
            env_var("JOB_API_BASE_URL").unwrap_or_else(|| DEFAULT_JOB_API_BASE_URL.to_string());
        let job_api_base_url = Url::parse(&raw_base).map_err(ConfigError::JobApiBaseUrl)?;

        let job_api_timeout = Duration::from_secs(positive_secs(
            "JOB_API_TIMEOUT_SECS",
            DEFAULT_JOB_API_TIMEOUT_SECS,
        )?);
        let sse_heartbeat = Duration::from_secs(positive_secs(
            "SSE_HEARTBEAT_SECS",
            DEFAULT_SSE_HEARTBEAT_SECS,
        )?);

        Ok(Self {
            bind_addr,
            environment,
            database_url,
            job_api_base_url,
            job_api_timeout,
            sse_heartbeat,
        })
    }
}

fn positive_secs(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = env_var(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidSeconds { name, value: raw }),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    JobApiBaseUrl(url::ParseError),
    InvalidSeconds { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::JobApiBaseUrl(err) => write!(f, "invalid JOB_API_BASE_URL value: {err}"),
            Self::InvalidSeconds { name, value } => {
                write!(f, "{name} must be a positive number of seconds (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_BIND_ADDR, ENV_GUARD};
    use std::env;

    fn clear_env() {
        for name in [
            "APP_ENV",
            "APP_BIND_ADDR",
            "DATABASE_URL",
            "JOB_API_BASE_URL",
            "JOB_API_TIMEOUT_SECS",
            "SSE_HEARTBEAT_SECS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn loads_defaults_in_development() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();

        let config = AppConfig::from_env().expect("config should load with defaults");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.job_api_base_url.as_str(), DEFAULT_JOB_API_BASE_URL);
        assert_eq!(config.job_api_timeout, Duration::from_secs(10));
        assert_eq!(config.sse_heartbeat, Duration::from_secs(20));
    }

    #[test]
    fn rejects_invalid_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("APP_ENV", "invalid");

        let err = AppConfig::from_env().expect_err("invalid env should error");
        assert!(matches!(err, ConfigError::InvalidEnvironment(value) if value == "invalid"));

        clear_env();
    }

    #[test]
    fn parses_production_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("APP_ENV", "production");
        env::set_var("APP_BIND_ADDR", "0.0.0.0:9000");
        env::set_var("JOB_API_BASE_URL", "https://jobs.example.com/api/v1/");
        env::set_var("JOB_API_TIMEOUT_SECS", "3");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.job_api_base_url.host_str(), Some("jobs.example.com"));
        assert_eq!(config.job_api_timeout, Duration::from_secs(3));

        clear_env();
    }

    #[test]
    fn rejects_malformed_base_url() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("JOB_API_BASE_URL", "not a url");

        let err = AppConfig::from_env().expect_err("bad url should error");
        assert!(matches!(err, ConfigError::JobApiBaseUrl(_)));

        clear_env();
    }

    #[test]
    fn rejects_zero_timeout() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("JOB_API_TIMEOUT_SECS", "0");

        let err = AppConfig::from_env().expect_err("zero timeout should error");
        assert!(
            matches!(err, ConfigError::InvalidSeconds { name, .. } if name == "JOB_API_TIMEOUT_SECS")
        );

        clear_env();
    }
}
