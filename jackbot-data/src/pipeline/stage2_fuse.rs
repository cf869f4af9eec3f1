use crate::pipeline::{Extracted, Fused};
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use std::collections::HashMap;
use std::time::Duration;

/// Entries idle this long are dropped - a `(exchange, symbol)` that hasn't
/// completed its fusion recently carries no signal worth keeping around.
pub const FUSE_EVICTION: Duration = Duration::from_secs(30);

/// Accumulated, not-yet-complete state for one `(exchange, symbol)`. Fields
/// are merged in field-by-field as each [`Extracted`] update arrives, rather
/// than replaced wholesale, so an earlier message's data survives a later
/// message that only updates the other half of the pair.
#[derive(Debug, Clone, Default)]
struct FuseEntry {
    price: Option<f64>,
    funding_rate: Option<f64>,
    current_settlement_ts: Option<i64>,
    next_settlement_ts: Option<i64>,
    last_settlement_ts: Option<i64>,
    last_updated_ms: i64,
}

/// Per-`(exchange, symbol)` accumulator. Single writer, no locking.
///
/// A pair completes once both a price-bearing and a funding-bearing update
/// have been seen from the same exchange: for OKX that's a separate ticker
/// and funding-rate message, for Binance a ticker plus a mark-price message
/// (mark-price already bundles the funding data). The completed record is
/// handed to the caller and its accumulator entry is cleared immediately, so
/// the next [`Extracted`] for that key starts fresh and the same completion
/// is never emitted twice.
pub struct FuseStage {
    entries: HashMap<(ExchangeId, Symbol), FuseEntry>,
}

impl FuseStage {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Merge one exchange's [`Extracted`] update into its `(exchange,
    /// symbol)` accumulator, evicting stale entries first. Returns the
    /// completed [`Fused`] record - and clears the accumulator - the moment
    /// both halves of the pair are present; `None` otherwise.
    pub fn fuse(&mut self, extracted: Extracted, now_ms: i64) -> Option<Fused> {
        self.evict(now_ms);

        let key = (extracted.exchange, extracted.symbol.clone());
        let entry = self.entries.entry(key.clone()).or_default();
        entry.last_updated_ms = now_ms;
        if extracted.price.is_some() {
            entry.price = extracted.price;
        }
        if extracted.funding_rate.is_some() {
            entry.funding_rate = extracted.funding_rate;
        }
        if extracted.current_settlement_ts.is_some() {
            entry.current_settlement_ts = extracted.current_settlement_ts;
        }
        if extracted.next_settlement_ts.is_some() {
            entry.next_settlement_ts = extracted.next_settlement_ts;
        }
        if extracted.last_settlement_ts.is_some() {
            entry.last_settlement_ts = extracted.last_settlement_ts;
        }

        let (Some(price), Some(funding_rate)) = (entry.price, entry.funding_rate) else {
            return None;
        };

        let fused = Fused {
            exchange: extracted.exchange,
            symbol: extracted.symbol,
            price,
            funding_rate,
            current_settlement_ts: entry.current_settlement_ts,
            next_settlement_ts: entry.next_settlement_ts,
            last_settlement_ts: entry.last_settlement_ts,
            last_updated_ms: now_ms,
        };
        self.entries.remove(&key);
        Some(fused)
    }

    /// Enrich a symbol's in-progress accumulator with a realised settlement.
    /// A settlement alone never completes a pair, and if the pair has
    /// already completed and been cleared there's nothing left to enrich -
    /// the next pair starts from a clean slate.
    pub fn enrich_settlement(
        &mut self,
        exchange: ExchangeId,
        symbol: &Symbol,
        settlement_ts: i64,
    ) {
        if let Some(entry) = self.entries.get_mut(&(exchange, symbol.clone())) {
            entry.last_settlement_ts = Some(settlement_ts);
        }
    }

    fn evict(&mut self, now_ms: i64) {
        let threshold = FUSE_EVICTION.as_millis() as i64;
        self.entries.retain(|_, entry| now_ms - entry.last_updated_ms < threshold);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for FuseStage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_only(exchange: ExchangeId, symbol: &str, price: f64) -> Extracted {
        Extracted {
            exchange,
            symbol: Symbol::normalize(symbol),
            price: Some(price),
            funding_rate: None,
            current_settlement_ts: None,
            next_settlement_ts: None,
            last_settlement_ts: None,
            ingress_timestamp: 0,
        }
    }

    fn funding_only(exchange: ExchangeId, symbol: &str, funding_rate: f64, settlement_ts: i64) -> Extracted {
        Extracted {
            exchange,
            symbol: Symbol::normalize(symbol),
            price: None,
            funding_rate: Some(funding_rate),
            current_settlement_ts: Some(settlement_ts),
            next_settlement_ts: None,
            last_settlement_ts: None,
            ingress_timestamp: 0,
        }
    }

    #[test]
    fn test_fuse_completes_only_once_both_halves_present() {
        let mut stage = FuseStage::new();
        assert!(stage.fuse(price_only(ExchangeId::Okx, "BTCUSDT", 100.0), 0).is_none());
        let fused = stage
            .fuse(funding_only(ExchangeId::Okx, "BTCUSDT", 0.0001, 1_700_000_000_000), 10)
            .expect("both halves now present");
        assert_eq!(fused.price, 100.0);
        assert_eq!(fused.funding_rate, 0.0001);
    }

    #[test]
    fn test_completion_clears_state_for_no_duplicate_emission() {
        let mut stage = FuseStage::new();
        stage.fuse(price_only(ExchangeId::Okx, "BTCUSDT", 100.0), 0);
        stage.fuse(funding_only(ExchangeId::Okx, "BTCUSDT", 0.0001, 1_700_000_000_000), 10);
        assert_eq!(stage.len(), 0);

        // The next update for the same key starts from a clean slate - one
        // price update alone must not re-complete using stale funding data.
        assert!(stage.fuse(price_only(ExchangeId::Okx, "BTCUSDT", 101.0), 20).is_none());
    }

    #[test]
    fn test_later_update_merges_rather_than_replaces() {
        let mut stage = FuseStage::new();
        stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 100.0), 0);
        // A second price-only update must not wipe out the first once funding arrives.
        stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 101.0), 5);
        let fused = stage
            .fuse(funding_only(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 0.0002, 1_700_000_000_000), 10)
            .expect("price from an earlier message must still be present");
        assert_eq!(fused.price, 101.0);
        assert_eq!(fused.funding_rate, 0.0002);
    }

    #[test]
    fn test_eviction_after_30s_idle() {
        let mut stage = FuseStage::new();
        stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 100.0), 0);
        // still within the window
        stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "ETHUSDT", 1.0), 29_000);
        assert_eq!(stage.len(), 2);
        // this tick evicts BTCUSDT (idle since t=0, now 31_000)
        stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "ETHUSDT", 1.1), 31_000);
        assert_eq!(stage.len(), 1);
    }

    #[test]
    fn test_settlement_enrichment_does_not_complete_pair() {
        let mut stage = FuseStage::new();
        stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 100.0), 5_000);
        stage.enrich_settlement(ExchangeId::BinanceFuturesUsd, &Symbol::normalize("BTCUSDT"), 1_700_000_000_000);

        let entry = stage
            .entries
            .get(&(ExchangeId::BinanceFuturesUsd, Symbol::normalize("BTCUSDT")))
            .unwrap();
        assert_eq!(entry.last_settlement_ts, Some(1_700_000_000_000));

        let fused = stage
            .fuse(funding_only(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 0.0001, 1_700_028_800_000), 6_000)
            .expect("now complete");
        assert_eq!(fused.last_settlement_ts, Some(1_700_000_000_000));
    }

    #[test]
    fn test_no_cross_symbol_leakage() {
        let mut stage = FuseStage::new();
        stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 100.0), 0);
        assert!(stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "ETHUSDT", 1.0), 0).is_none());
        assert_eq!(stage.len(), 2);
    }

    #[test]
    fn test_no_cross_exchange_leakage_for_same_symbol() {
        let mut stage = FuseStage::new();
        // Binance price only - OKX's independent accumulator for the same
        // symbol must not be able to complete off it.
        stage.fuse(price_only(ExchangeId::BinanceFuturesUsd, "BTCUSDT", 100.0), 0);
        assert!(stage.fuse(funding_only(ExchangeId::Okx, "BTCUSDT", 0.0001, 1_700_000_000_000), 0).is_none());
    }
}
