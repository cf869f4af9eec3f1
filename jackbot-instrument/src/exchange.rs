use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// Stable index of an [`ExchangeId`] within a fixed-size slot arena.
///
/// Worker identities are ephemeral and may change across a failover
/// (see [`jackbot_data::pool`]), but the `ExchangeIndex` backing a
/// shard/slot is stable for the life of the process.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct ExchangeIndex(pub usize);

impl ExchangeIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ExchangeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeIndex({})", self.0)
    }
}

/// Unique identifier for an exchange this system maintains a market-data
/// connection pool for.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename = "exchange", rename_all = "snake_case")]
pub enum ExchangeId {
    Other,
    BinanceFuturesUsd,
    Okx,
}

impl ExchangeId {
    /// Return the &str representation of this [`ExchangeId`]
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Other => "other",
            ExchangeId::BinanceFuturesUsd => "binance_futures_usd",
            ExchangeId::Okx => "okx",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_de_exchange_id() {
        assert_eq!(
            serde_json::from_str::<ExchangeId>(r#""okx""#).unwrap(),
            ExchangeId::Okx
        );
        assert_eq!(
            serde_json::from_str::<ExchangeId>(r#""binance_futures_usd""#).unwrap(),
            ExchangeId::BinanceFuturesUsd
        );
    }

    #[test]
    fn test_exchange_index_display() {
        assert_eq!(ExchangeIndex(3).to_string(), "ExchangeIndex(3)");
    }
}
