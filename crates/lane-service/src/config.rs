//! Lane server configuration.
//!
//! Configuration is loaded from environment variables. Every setting has a
//! default; numeric settings are parsed strictly and must be positive.

use common::types::{LaneId, VenueId};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP/WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8787";

/// Venue of the lane created at start-up.
pub const DEFAULT_VENUE_ID: &str = "venue_default";

/// Lane created at start-up.
pub const DEFAULT_LANE_ID: &str = "lane_1";

/// Game mode applied when `admin:lane:start` omits one.
pub const DEFAULT_GAME_MODE: &str = "Classic";

/// Lock-in lifetime (60 minutes).
pub const DEFAULT_LOCK_IN_TTL_SECONDS: u64 = 3600;

/// Interval between expired lock-in sweeps.
pub const DEFAULT_LOCK_IN_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Interval between status log lines.
pub const DEFAULT_STATUS_LOG_INTERVAL_SECONDS: u64 = 10;

/// Outbound queue capacity per connection.
pub const DEFAULT_CONNECTION_BUFFER: usize = 256;

/// Lane server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP/WebSocket bind address (default: "0.0.0.0:8787").
    pub bind_address: String,

    /// Venue of the eagerly created default lane.
    pub default_venue_id: VenueId,

    /// Eagerly created default lane.
    pub default_lane_id: LaneId,

    /// Game mode used by `startLane` when the admin sends none.
    pub default_game_mode: String,

    /// Lock-in TTL in seconds (default: 3600).
    pub lock_in_ttl_seconds: u64,

    /// Expired lock-in sweep interval in seconds (default: 60).
    pub lock_in_sweep_interval_seconds: u64,

    /// Status log interval in seconds (default: 10).
    pub status_log_interval_seconds: u64,

    /// Outbound message queue capacity per connection (default: 256).
    pub connection_buffer: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            default_venue_id: VenueId::new(DEFAULT_VENUE_ID),
            default_lane_id: LaneId::new(DEFAULT_LANE_ID),
            default_game_mode: DEFAULT_GAME_MODE.to_string(),
            lock_in_ttl_seconds: DEFAULT_LOCK_IN_TTL_SECONDS,
            lock_in_sweep_interval_seconds: DEFAULT_LOCK_IN_SWEEP_INTERVAL_SECONDS,
            status_log_interval_seconds: DEFAULT_STATUS_LOG_INTERVAL_SECONDS,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is present but
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric variable is not a
    /// positive integer or an identifier is blank.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_address = vars
            .get("LANE_BIND_ADDRESS")
            .cloned()
            .unwrap_or(defaults.bind_address);

        let default_venue_id = match vars.get("LANE_DEFAULT_VENUE_ID") {
            Some(v) => VenueId::new(non_blank("LANE_DEFAULT_VENUE_ID", v)?),
            None => defaults.default_venue_id,
        };

        let default_lane_id = match vars.get("LANE_DEFAULT_LANE_ID") {
            Some(v) => LaneId::new(non_blank("LANE_DEFAULT_LANE_ID", v)?),
            None => defaults.default_lane_id,
        };

        let default_game_mode = match vars.get("LANE_DEFAULT_GAME_MODE") {
            Some(v) => non_blank("LANE_DEFAULT_GAME_MODE", v)?.to_string(),
            None => defaults.default_game_mode,
        };

        let lock_in_ttl_seconds = parse_positive(
            vars,
            "LANE_LOCK_IN_TTL_SECONDS",
            defaults.lock_in_ttl_seconds,
        )?;

        let lock_in_sweep_interval_seconds = parse_positive(
            vars,
            "LANE_LOCK_IN_SWEEP_INTERVAL_SECONDS",
            defaults.lock_in_sweep_interval_seconds,
        )?;

        let status_log_interval_seconds = parse_positive(
            vars,
            "LANE_STATUS_LOG_INTERVAL_SECONDS",
            defaults.status_log_interval_seconds,
        )?;

        let connection_buffer =
            parse_positive(vars, "LANE_CONNECTION_BUFFER", defaults.connection_buffer)?;

        Ok(Config {
            bind_address,
            default_venue_id,
            default_lane_id,
            default_game_mode,
            lock_in_ttl_seconds,
            lock_in_sweep_interval_seconds,
            status_log_interval_seconds,
            connection_buffer,
        })
    }

    /// Lock-in lifetime as a wall-clock duration.
    #[must_use]
    pub fn lock_in_ttl(&self) -> chrono::Duration {
        i64::try_from(self.lock_in_ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    #[must_use]
    pub fn lock_in_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.lock_in_sweep_interval_seconds)
    }

    #[must_use]
    pub fn status_log_interval(&self) -> Duration {
        Duration::from_secs(self.status_log_interval_seconds)
    }
}

fn non_blank<'a>(name: &str, value: &'a str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue(format!("{name} must not be empty")));
    }
    Ok(trimmed)
}

fn parse_positive<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };

    let value: T = raw.trim().parse().map_err(|_| {
        ConfigError::InvalidValue(format!("{name} must be a positive integer, got '{raw}'"))
    })?;

    if value <= T::default() {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.default_venue_id.as_str(), "venue_default");
        assert_eq!(config.default_lane_id.as_str(), "lane_1");
        assert_eq!(config.default_game_mode, "Classic");
        assert_eq!(config.lock_in_ttl_seconds, 3600);
        assert_eq!(config.lock_in_sweep_interval_seconds, 60);
        assert_eq!(config.status_log_interval_seconds, 10);
        assert_eq!(config.connection_buffer, 256);
        assert_eq!(config.lock_in_ttl(), chrono::Duration::minutes(60));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let vars = HashMap::from([
            ("LANE_BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string()),
            ("LANE_DEFAULT_VENUE_ID".to_string(), "venue_north".to_string()),
            ("LANE_DEFAULT_LANE_ID".to_string(), "lane_7".to_string()),
            ("LANE_DEFAULT_GAME_MODE".to_string(), "Zombies".to_string()),
            ("LANE_LOCK_IN_TTL_SECONDS".to_string(), "120".to_string()),
            (
                "LANE_LOCK_IN_SWEEP_INTERVAL_SECONDS".to_string(),
                "5".to_string(),
            ),
            ("LANE_STATUS_LOG_INTERVAL_SECONDS".to_string(), "30".to_string()),
            ("LANE_CONNECTION_BUFFER".to_string(), "16".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.default_venue_id.as_str(), "venue_north");
        assert_eq!(config.default_lane_id.as_str(), "lane_7");
        assert_eq!(config.default_game_mode, "Zombies");
        assert_eq!(config.lock_in_ttl_seconds, 120);
        assert_eq!(config.lock_in_sweep_interval(), Duration::from_secs(5));
        assert_eq!(config.status_log_interval(), Duration::from_secs(30));
        assert_eq!(config.connection_buffer, 16);
    }

    #[test]
    fn test_non_numeric_ttl_rejected() {
        let vars = HashMap::from([(
            "LANE_LOCK_IN_TTL_SECONDS".to_string(),
            "an hour".to_string(),
        )]);

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("LANE_LOCK_IN_TTL_SECONDS"))
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let vars = HashMap::from([(
            "LANE_LOCK_IN_SWEEP_INTERVAL_SECONDS".to_string(),
            "0".to_string(),
        )]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_zero_connection_buffer_rejected() {
        let vars = HashMap::from([("LANE_CONNECTION_BUFFER".to_string(), "0".to_string())]);
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_blank_default_lane_rejected() {
        let vars = HashMap::from([("LANE_DEFAULT_LANE_ID".to_string(), "  ".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("LANE_DEFAULT_LANE_ID"))
        );
    }
}
