//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration as StdDuration;

use chrono::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Average defects-per-event at or below which a machine is Healthy.
    pub stats_healthy_threshold: f64,

    /// Floor applied to the `hours` divisor in `avg_defect_rate`
    /// (`hours = max(stats_min_window_hours, (end-start)/1h)`), so a
    /// narrow stats window never inflates the rate. Does not affect which
    /// rows are queried.
    pub stats_min_window_hours: f64,

    /// How many times the Upsert Engine retries a single event through the
    /// per-row fallback path before giving up as a concurrency failure.
    pub max_retries: u32,

    /// How far into the future an event's `eventTime` may be before it is
    /// rejected as clock skew.
    pub event_future_skew: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let stats_healthy_threshold = env::var("STATS_HEALTHY_THRESHOLD")
            .unwrap_or_else(|_| "2.0".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("STATS_HEALTHY_THRESHOLD"))?;

        let stats_min_window_hours = env::var("STATS_MIN_WINDOW_HOURS")
            .unwrap_or_else(|_| "1.0".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("STATS_MIN_WINDOW_HOURS"))?;

        let max_retries = env::var("MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MAX_RETRIES"))?;

        let event_future_skew_minutes: i64 = env::var("EVENT_FUTURE_SKEW_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("EVENT_FUTURE_SKEW_MINUTES"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            stats_healthy_threshold,
            stats_min_window_hours,
            max_retries,
            event_future_skew: Duration::minutes(event_future_skew_minutes),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// `request_timeout` for tower-http's `TimeoutLayer`; not itself
    /// environment-configurable, kept as a single named constant here
    /// alongside the rest of the server's tuning knobs.
    pub fn request_timeout() -> StdDuration {
        StdDuration::from_secs(30)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
