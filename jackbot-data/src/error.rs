use jackbot_instrument::exchange::ExchangeId;
use thiserror::Error;

/// Errors surfaced by the market-data aggregation and arbitrage-signal engine.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("transport error on {exchange}: {source}")]
    Transport {
        exchange: ExchangeId,
        #[source]
        source: jackbot_integration::error::SocketError,
    },

    #[error("no backup worker available for exchange {0}, shard {1}")]
    NoBackupAvailable(ExchangeId, usize),

    #[error("slot {0:?} is cooling down, {1:?} remaining")]
    SlotCooldown((ExchangeId, usize), std::time::Duration),

    #[error("historical funding fetch hard-stopped by exchange {0}: status {1}")]
    HardStopped(ExchangeId, u16),

    #[error("manual funding fetch trigger limit reached: {0} in the last hour")]
    ManualTriggerLimitReached(usize),

    #[error("failed to load config from {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
