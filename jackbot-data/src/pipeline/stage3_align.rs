use crate::pipeline::{Aligned, AlignedExchange, Fused};
use chrono::{FixedOffset, TimeZone};
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use std::collections::HashMap;
use std::time::Duration;

/// A completed [`Fused`] side is held for this long waiting on the other
/// exchange before it's dropped - shorter than
/// [`crate::pipeline::stage2_fuse::FUSE_EVICTION`] since a side sitting here
/// is already complete and only needs pairing, not re-accumulation.
pub const ALIGN_EVICTION: Duration = Duration::from_secs(10);

fn utc8() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("UTC+8 offset is valid")
}

/// Render a raw millisecond timestamp as a UTC+8 human-readable string,
/// eg `2024-01-01 08:00:00`. The raw `i64` is always preserved alongside it.
pub fn humanize(ms: i64) -> String {
    utc8()
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("invalid_timestamp({ms})"))
}

fn align_exchange(fused: &Fused) -> AlignedExchange {
    AlignedExchange {
        price: fused.price,
        funding_rate: fused.funding_rate,
        current_settlement_ts: fused.current_settlement_ts,
        current_settlement_human: fused.current_settlement_ts.map(humanize),
        next_settlement_ts: fused.next_settlement_ts,
        next_settlement_human: fused.next_settlement_ts.map(humanize),
    }
}

/// Joins both exchanges' latest completed [`Fused`] records per symbol.
/// Each exchange side is cached independently the moment it completes;
/// [`Aligned`] is only ever produced once both sides are present.
pub struct AlignStage {
    binance: HashMap<Symbol, Fused>,
    okx: HashMap<Symbol, Fused>,
}

impl AlignStage {
    pub fn new() -> Self {
        Self { binance: HashMap::new(), okx: HashMap::new() }
    }

    fn evict(&mut self, now_ms: i64) {
        let threshold = ALIGN_EVICTION.as_millis() as i64;
        self.binance.retain(|_, fused| now_ms - fused.last_updated_ms < threshold);
        self.okx.retain(|_, fused| now_ms - fused.last_updated_ms < threshold);
    }

    /// Record `fused`'s exchange side for its symbol and, if the other
    /// exchange already has a current completion for that symbol, emit the
    /// cross-exchange join.
    pub fn align(&mut self, fused: Fused, now_ms: i64) -> Option<Aligned> {
        self.evict(now_ms);

        let symbol = fused.symbol.clone();
        match fused.exchange {
            ExchangeId::BinanceFuturesUsd => {
                self.binance.insert(symbol.clone(), fused);
            }
            ExchangeId::Okx => {
                self.okx.insert(symbol.clone(), fused);
            }
            ExchangeId::Other => return None,
        }

        let binance = self.binance.get(&symbol)?;
        let okx = self.okx.get(&symbol)?;

        Some(Aligned {
            symbol,
            binance: align_exchange(binance),
            okx: align_exchange(okx),
        })
    }
}

impl Default for AlignStage {
    fn default() -> Self {
        Self::new()
    }
}
