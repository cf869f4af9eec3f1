use crate::observation::{DataType, Observation};
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where an [`Observation`] of a given `(exchange, data_type)` should be
/// routed once stored.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Flow {
    /// Feed the fusion pipeline (ticker, mark_price, funding_rate, funding_settlement).
    Pipeline,
    /// Hand straight to the brain callback, bypassing the pipeline (account
    /// and order data types, which this crate never constructs itself but
    /// must still route correctly if ever observed on the wire).
    BrainCallback,
    /// Store for introspection only; nothing downstream is notified.
    None,
}

fn flow_for(data_type: DataType) -> Flow {
    match data_type {
        DataType::Ticker | DataType::MarkPrice | DataType::FundingRate | DataType::FundingSettlement => {
            Flow::Pipeline
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct Key {
    exchange: ExchangeId,
    symbol: Symbol,
    data_type: DataType,
}

/// Most-recent-observation store: `(exchange, symbol, data_type) -> Observation`.
///
/// One [`RwLock`]-guarded map, not one lock per key - contention is low
/// relative to the cost of per-key lock bookkeeping at this data volume.
#[derive(Clone, Default)]
pub struct DataStore {
    inner: Arc<RwLock<HashMap<Key, Observation>>>,
    latest_data_type: Arc<RwLock<HashMap<(ExchangeId, Symbol), DataType>>>,
    http_server_ready: Arc<AtomicBool>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the latest observation for its `(exchange, symbol, data_type)`
    /// key, returning the [`Flow`] it should now be routed to.
    pub async fn insert(&self, observation: Observation) -> Flow {
        let flow = flow_for(observation.data_type);
        let key = Key {
            exchange: observation.exchange,
            symbol: observation.symbol.clone(),
            data_type: observation.data_type,
        };

        let mut latest = self.latest_data_type.write().await;
        latest.insert((observation.exchange, observation.symbol.clone()), observation.data_type);
        drop(latest);

        let mut guard = self.inner.write().await;
        guard.insert(key, observation);
        flow
    }

    pub async fn get(
        &self,
        exchange: ExchangeId,
        symbol: &Symbol,
        data_type: DataType,
    ) -> Option<Observation> {
        let key = Key {
            exchange,
            symbol: symbol.clone(),
            data_type,
        };
        self.inner.read().await.get(&key).cloned()
    }

    /// The most recently updated [`DataType`] seen for `(exchange, symbol)`.
    pub async fn latest_data_type(
        &self,
        exchange: ExchangeId,
        symbol: &Symbol,
    ) -> Option<DataType> {
        self.latest_data_type
            .read()
            .await
            .get(&(exchange, symbol.clone()))
            .copied()
    }

    pub async fn snapshot(&self) -> Vec<Observation> {
        self.inner.read().await.values().cloned().collect()
    }

    pub fn mark_http_server_ready(&self) {
        self.http_server_ready.store(true, Ordering::SeqCst);
    }

    pub fn is_http_server_ready(&self) -> bool {
        self.http_server_ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Payload;

    fn ticker(exchange: ExchangeId, symbol: &str, price: f64) -> Observation {
        Observation {
            exchange,
            symbol: Symbol::normalize(symbol),
            data_type: DataType::Ticker,
            payload: Payload::Ticker { price },
            ingress_timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let store = DataStore::new();
        let flow = store.insert(ticker(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 100.0)).await;
        assert_eq!(flow, Flow::Pipeline);

        let got = store
            .get(ExchangeId::BinanceFuturesUsd, &Symbol::normalize("BTCUSDT"), DataType::Ticker)
            .await
            .unwrap();
        match got.payload {
            Payload::Ticker { price } => assert_eq!(price, 100.0),
            _ => panic!("expected Ticker"),
        }
    }

    #[tokio::test]
    async fn test_most_recent_observation_replaces_prior() {
        let store = DataStore::new();
        store.insert(ticker(ExchangeId::Okx, "ETHUSDT", 1.0)).await;
        store.insert(ticker(ExchangeId::Okx, "ETHUSDT", 2.0)).await;

        let got = store
            .get(ExchangeId::Okx, &Symbol::normalize("ETHUSDT"), DataType::Ticker)
            .await
            .unwrap();
        match got.payload {
            Payload::Ticker { price } => assert_eq!(price, 2.0),
            _ => panic!("expected Ticker"),
        }
    }

    #[tokio::test]
    async fn test_funding_settlement_routes_to_pipeline() {
        let store = DataStore::new();
        let flow = store
            .insert(Observation {
                exchange: ExchangeId::BinanceFuturesUsd,
                symbol: Symbol::normalize("BTCUSDT"),
                data_type: DataType::FundingSettlement,
                payload: Payload::FundingSettlement { funding_rate: 0.0001, settlement_ts: 0 },
                ingress_timestamp: 0,
            })
            .await;
        assert_eq!(flow, Flow::Pipeline);
    }

    #[tokio::test]
    async fn test_no_cross_symbol_leakage() {
        let store = DataStore::new();
        store.insert(ticker(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 100.0)).await;
        let other = store
            .get(ExchangeId::BinanceFuturesUsd, &Symbol::normalize("ETHUSDT"), DataType::Ticker)
            .await;
        assert!(other.is_none());
    }
}
