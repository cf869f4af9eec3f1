//! Five-stage streaming fusion pipeline plus the Stage 0 rate limiter that
//! guards it. Single-writer: every stage owns its state exclusively and is
//! driven from one task, so no stage needs internal locking.

use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use serde::Serialize;

pub mod stage0_limiter;
pub mod stage1_filter;
pub mod stage2_fuse;
pub mod stage3_align;
pub mod stage4_per_exchange;
pub mod stage5_cross;

/// Stage 1 output: one exchange's market-data fields for one symbol, in a
/// shape common to Binance and OKX regardless of wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub price: Option<f64>,
    pub funding_rate: Option<f64>,
    /// Settlement time of the cycle currently in progress, ms since epoch.
    pub current_settlement_ts: Option<i64>,
    /// Settlement time of the next cycle, ms since epoch - only ever known
    /// directly from OKX; derived for Binance (see [`stage4_per_exchange`]).
    pub next_settlement_ts: Option<i64>,
    /// Timestamp of the most recent *realised* funding payment, ms since
    /// epoch - set by Stage 2 from a `funding_settlement` observation, never
    /// by Stage 1. Updating it alone does not trigger a fusion emission.
    pub last_settlement_ts: Option<i64>,
    pub ingress_timestamp: i64,
}

/// Stage 2 output: one exchange's complete state for a symbol - both its
/// price-bearing and funding-bearing fields now present. Produced once per
/// completion and immediately cleared from [`stage2_fuse::FuseStage`]'s
/// cache, so the same completion is never emitted twice in a row.
#[derive(Debug, Clone)]
pub struct Fused {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub price: f64,
    pub funding_rate: f64,
    /// Settlement time of the cycle currently in progress, ms since epoch.
    pub current_settlement_ts: Option<i64>,
    /// Settlement time of the next cycle, ms since epoch - only ever known
    /// directly from OKX; derived for Binance (see [`stage4_per_exchange`]).
    pub next_settlement_ts: Option<i64>,
    /// Timestamp of the most recent *realised* funding payment, if one has
    /// been seen for this exchange/symbol since the last completion.
    pub last_settlement_ts: Option<i64>,
    pub last_updated_ms: i64,
}

/// Stage 3 output: the cross-exchange join of both exchanges' [`Fused`]
/// records for one symbol - exists only once both sides have reported.
/// Timestamps carry both the raw millisecond value (for machine
/// consumption) and a UTC+8 human-readable rendering (for the HTTP
/// introspection surface).
#[derive(Debug, Clone, Serialize)]
pub struct Aligned {
    pub symbol: Symbol,
    pub binance: AlignedExchange,
    pub okx: AlignedExchange,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignedExchange {
    pub price: f64,
    pub funding_rate: f64,
    pub current_settlement_ts: Option<i64>,
    pub current_settlement_human: Option<String>,
    pub next_settlement_ts: Option<i64>,
    pub next_settlement_human: Option<String>,
}

/// Stage 4 output: one exchange's derived per-symbol metrics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PerExchangeMetrics {
    pub period_seconds: i64,
    pub countdown_seconds: i64,
}

/// Stage 5 output: the cross-exchange arbitrage signal for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct CrossSignal {
    pub symbol: Symbol,
    pub price_diff: f64,
    pub price_diff_percent: f64,
    pub rate_diff: f64,
    pub price_invalid: bool,
}
