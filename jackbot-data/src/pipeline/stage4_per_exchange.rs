use crate::pipeline::{Aligned, AlignedExchange, PerExchangeMetrics};
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use std::collections::HashMap;

/// Used when a symbol's funding cycle length can't yet be derived (first
/// observation, or a Binance symbol that hasn't rolled a cycle since this
/// process started) - the standard 8 hour funding interval most USDT-margined
/// perpetuals use.
const DEFAULT_PERIOD_SECONDS: i64 = 8 * 3600;

#[derive(Debug, Clone, Copy)]
struct State {
    last_settlement_ts: i64,
    period_seconds: i64,
}

/// Both exchanges' derived per-symbol metrics for one [`Aligned`] emission.
#[derive(Debug, Clone, Copy)]
pub struct PerExchangePair {
    pub binance: Option<PerExchangeMetrics>,
    pub okx: Option<PerExchangeMetrics>,
}

/// Persistent per-`(exchange, symbol)` cache computing each exchange's own
/// funding-cycle metrics, driven off Stage 3's [`Aligned`] output so both
/// exchanges' metrics for a symbol are always computed together.
///
/// Binance (EX-A) only ever reports the current cycle's settlement time, so
/// its period is *rolled*: each time that settlement time advances, the gap
/// to the previous one becomes the new period estimate. OKX (EX-B) reports
/// both the current and next settlement time directly every update, so its
/// period needs no rolling state.
pub struct PerExchangeStage {
    state: HashMap<(ExchangeId, Symbol), State>,
}

impl PerExchangeStage {
    pub fn new() -> Self {
        Self { state: HashMap::new() }
    }

    pub fn compute(&mut self, aligned: &Aligned, now_ms: i64) -> PerExchangePair {
        PerExchangePair {
            binance: self.compute_one(ExchangeId::BinanceFuturesUsd, &aligned.symbol, &aligned.binance, now_ms),
            okx: self.compute_one(ExchangeId::Okx, &aligned.symbol, &aligned.okx, now_ms),
        }
    }

    fn compute_one(
        &mut self,
        exchange: ExchangeId,
        symbol: &Symbol,
        side: &AlignedExchange,
        now_ms: i64,
    ) -> Option<PerExchangeMetrics> {
        let settlement_ts = side.current_settlement_ts?;

        let period_seconds = match exchange {
            ExchangeId::Okx => side
                .next_settlement_ts
                .map(|next| (next - settlement_ts) / 1000)
                .unwrap_or(DEFAULT_PERIOD_SECONDS),
            ExchangeId::BinanceFuturesUsd | ExchangeId::Other => {
                self.roll_binance_period(exchange, symbol, settlement_ts)
            }
        };

        let countdown_seconds = ((settlement_ts - now_ms) / 1000).max(0);

        Some(PerExchangeMetrics {
            period_seconds,
            countdown_seconds,
        })
    }

    fn roll_binance_period(&mut self, exchange: ExchangeId, symbol: &Symbol, settlement_ts: i64) -> i64 {
        let key = (exchange, symbol.clone());
        match self.state.get_mut(&key) {
            Some(state) if state.last_settlement_ts != settlement_ts => {
                let delta = (settlement_ts - state.last_settlement_ts) / 1000;
                // A forward-moving cycle rollover; a negative/zero delta
                // means this is a backfilled or repeated timestamp - keep
                // the previously rolled period rather than trust it.
                if delta > 0 {
                    state.period_seconds = delta;
                }
                state.last_settlement_ts = settlement_ts;
                state.period_seconds
            }
            Some(state) => state.period_seconds,
            None => {
                self.state.insert(
                    key,
                    State {
                        last_settlement_ts: settlement_ts,
                        period_seconds: DEFAULT_PERIOD_SECONDS,
                    },
                );
                DEFAULT_PERIOD_SECONDS
            }
        }
    }
}

impl Default for PerExchangeStage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(price: f64, funding_rate: f64, current_settlement_ts: i64, next_settlement_ts: Option<i64>) -> AlignedExchange {
        AlignedExchange {
            price,
            funding_rate,
            current_settlement_ts: Some(current_settlement_ts),
            current_settlement_human: None,
            next_settlement_ts,
            next_settlement_human: None,
        }
    }

    fn aligned(binance: AlignedExchange, okx: AlignedExchange) -> Aligned {
        Aligned {
            symbol: Symbol::normalize("BTCUSDT"),
            binance,
            okx,
        }
    }

    #[test]
    fn test_okx_period_from_next_and_current() {
        let mut stage = PerExchangeStage::new();
        let record = aligned(
            side(99.0, 0.0002, 1_700_000_000_000, None),
            side(100.0, 0.00005, 1_700_000_000_000, Some(1_700_028_800_000)),
        );
        let pair = stage.compute(&record, 1_699_999_000_000);
        assert_eq!(pair.okx.unwrap().period_seconds, 28_800);
    }

    #[test]
    fn test_binance_first_observation_uses_default_period() {
        let mut stage = PerExchangeStage::new();
        let record = aligned(
            side(99.0, 0.0002, 1_700_000_000_000, None),
            side(100.0, 0.00005, 1_700_000_000_000, Some(1_700_028_800_000)),
        );
        let pair = stage.compute(&record, 1_699_999_000_000);
        assert_eq!(pair.binance.unwrap().period_seconds, 28_800);
    }

    #[test]
    fn test_binance_rolls_period_on_cycle_advance() {
        let mut stage = PerExchangeStage::new();
        stage.compute(
            &aligned(side(99.0, 0.0002, 1_700_000_000_000, None), side(100.0, 0.00005, 1_700_000_000_000, None)),
            0,
        );
        let pair = stage.compute(
            &aligned(side(99.0, 0.0002, 1_700_028_800_000, None), side(100.0, 0.00005, 1_700_028_800_000, None)),
            0,
        );
        assert_eq!(pair.binance.unwrap().period_seconds, 28_800);
    }

    #[test]
    fn test_binance_settlement_is_monotonic_non_decreasing_period_source() {
        let mut stage = PerExchangeStage::new();
        stage.compute(
            &aligned(side(99.0, 0.0002, 1_700_000_000_000, None), side(100.0, 0.00005, 1_700_000_000_000, None)),
            0,
        );
        stage.compute(
            &aligned(side(99.0, 0.0002, 1_700_028_800_000, None), side(100.0, 0.00005, 1_700_028_800_000, None)),
            0,
        );
        // A repeated/backwards timestamp keeps the last good period instead
        // of going negative.
        let pair = stage.compute(
            &aligned(side(99.0, 0.0002, 1_700_028_800_000, None), side(100.0, 0.00005, 1_700_028_800_000, None)),
            0,
        );
        assert_eq!(pair.binance.unwrap().period_seconds, 28_800);
    }

    #[test]
    fn test_countdown_never_negative() {
        let mut stage = PerExchangeStage::new();
        let pair = stage.compute(
            &aligned(
                side(99.0, 0.0002, 1_700_000_000_000, None),
                side(100.0, 0.00005, 1_700_000_000_000, None),
            ),
            1_800_000_000_000,
        );
        assert_eq!(pair.binance.unwrap().countdown_seconds, 0);
    }
}
