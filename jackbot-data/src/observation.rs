use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use serde::{Deserialize, Serialize};

/// The four market data types this system recognises. Account/order data
/// types exist on the wire (see [`crate::store::Flow`]) but are never
/// constructed by this crate - they pass through untouched to the brain
/// callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Ticker,
    FundingRate,
    MarkPrice,
    FundingSettlement,
}

/// One normalised wire event, prior to Stage 1 extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub data_type: DataType,
    pub payload: Payload,
    /// Milliseconds since the Unix epoch, recorded on ingress into
    /// [`crate::store::DataStore`] - not the exchange's own event time.
    pub ingress_timestamp: i64,
}

/// Exchange-agnostic payload carried by an [`Observation`]. Stage 1
/// (`crate::pipeline::stage1_filter`) maps this, together with
/// `(exchange, data_type)`, onto the [`crate::pipeline::Extracted`] record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    /// A trade/book ticker: latest traded price.
    Ticker { price: f64 },
    /// Binance `markPriceUpdate`: bundles the current funding rate and the
    /// settlement timestamp of the *current* funding cycle.
    MarkPrice {
        funding_rate: f64,
        current_settlement_ts: i64,
    },
    /// OKX `funding-rate` channel: current rate plus both the in-progress
    /// cycle's settlement time and the next cycle's.
    FundingRate {
        funding_rate: f64,
        current_settlement_ts: i64,
        next_settlement_ts: i64,
    },
    /// A settled historical funding payment (§4.8). Carries only the
    /// already-realised settlement time.
    FundingSettlement {
        funding_rate: f64,
        settlement_ts: i64,
    },
}
