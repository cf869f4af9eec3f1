use crate::error::{ConfigError, DataError};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

fn duration_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Duration::from_secs(u64::deserialize(deserializer)?))
}

/// Top-level runtime configuration, loaded from a TOML file at the path
/// given by the `CONFIG_PATH` environment variable (default `config.toml`).
/// Duration fields are expressed in the file as plain seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Symbol universe to track on both exchanges, in Binance-native form
    /// (eg `BTCUSDT`).
    pub symbols: Vec<String>,
    pub pool: PoolConfig,
    pub monitor: MonitorConfig,
    pub rate_limit: RateLimitConfig,
    pub historical: HistoricalConfig,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            pool: PoolConfig::default(),
            monitor: MonitorConfig::default(),
            rate_limit: RateLimitConfig::default(),
            historical: HistoricalConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the path in `CONFIG_PATH`, falling back to
    /// `config.toml`. Missing file is not an error - defaults apply.
    pub fn load() -> Result<Self, DataError> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| DataError::Config {
                path: path.clone(),
                source: ConfigError::Parse(source),
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(DataError::Config {
                path,
                source: ConfigError::Io(error),
            }),
        }
    }
}

/// Shard counts per exchange and batching parameters for subscription setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub binance_shards: usize,
    pub okx_shards: usize,
    pub subscribe_batch_size: usize,
    #[serde(deserialize_with = "duration_secs")]
    pub subscribe_batch_pause: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            binance_shards: 2,
            okx_shards: 1,
            subscribe_batch_size: 50,
            subscribe_batch_pause: Duration::from_secs(1),
        }
    }
}

/// Failover timing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    #[serde(deserialize_with = "duration_secs")]
    pub disconnect_threshold: Duration,
    #[serde(deserialize_with = "duration_secs")]
    pub slot_cooldown: Duration,
    #[serde(deserialize_with = "duration_secs")]
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            disconnect_threshold: Duration::from_secs(45),
            slot_cooldown: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub batch_limit: usize,
    #[serde(deserialize_with = "duration_secs")]
    pub batch_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            batch_limit: 20,
            batch_window: Duration::from_secs(1),
        }
    }
}

/// Historical funding-rate fetcher scheduling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoricalConfig {
    #[serde(deserialize_with = "duration_secs")]
    pub startup_delay: Duration,
    #[serde(deserialize_with = "duration_secs")]
    pub poll_interval: Duration,
    pub manual_trigger_limit_per_hour: usize,
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(180),
            poll_interval: Duration::from_secs(3600),
            manual_trigger_limit_per_hour: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(10_000);
        Self { port }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_spec_constants() {
        let config = Config::default();
        assert_eq!(config.pool.binance_shards, 2);
        assert_eq!(config.pool.okx_shards, 1);
        assert_eq!(config.pool.subscribe_batch_size, 50);
        assert_eq!(config.monitor.disconnect_threshold, Duration::from_secs(45));
        assert_eq!(config.monitor.slot_cooldown, Duration::from_secs(30));
        assert_eq!(config.historical.startup_delay, Duration::from_secs(180));
        assert_eq!(config.historical.manual_trigger_limit_per_hour, 3);
    }

    #[test]
    fn test_parse_partial_toml_fills_defaults() {
        let toml_str = r#"
            [pool]
            binance_shards = 4
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pool.binance_shards, 4);
        assert_eq!(config.pool.okx_shards, 1);
    }
}
