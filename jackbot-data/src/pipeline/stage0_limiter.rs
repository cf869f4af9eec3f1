use crate::observation::{DataType, Observation};
use jackbot_instrument::exchange::ExchangeId;
use std::time::{Duration, Instant};

/// Guards the pipeline from a burst of `funding_settlement` backfill writes
/// (the historical fetcher can write many at once after a gap). Counts only
/// Binance (EX-A) `funding_settlement` observations within a rolling batch
/// window; everything else passes straight through.
pub struct Stage0Limiter {
    limit: usize,
    window: Duration,
    window_start: Instant,
    count: usize,
    blocked: bool,
}

impl Stage0Limiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            window_start: Instant::now(),
            count: 0,
            blocked: false,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Reconfigure the limit/window, clearing any active block.
    pub fn reconfigure(&mut self, limit: usize, window: Duration) {
        self.limit = limit;
        self.window = window;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.window_start = Instant::now();
        self.count = 0;
        self.blocked = false;
    }

    fn roll_window(&mut self) {
        if self.window_start.elapsed() >= self.window {
            self.window_start = Instant::now();
            self.count = 0;
            self.blocked = false;
        }
    }

    /// Admit or reject one already-formed batch of observations. The
    /// counter increments once per batch containing at least one qualifying
    /// row, not once per row - a historical-fetcher cycle that backfills a
    /// hundred symbols' settlements in one pass still only spends a single
    /// unit of quota. The batch that pushes the counter to the limit still
    /// passes through entirely; only subsequent batches are dropped.
    pub fn admit_batch(&mut self, rows: &[Observation]) -> bool {
        self.roll_window();

        let has_qualifying = rows
            .iter()
            .any(|o| o.exchange == ExchangeId::BinanceFuturesUsd && o.data_type == DataType::FundingSettlement);

        if !has_qualifying {
            return true;
        }

        if self.blocked {
            return false;
        }

        self.count += 1;
        if self.count > self.limit {
            self.blocked = true;
        }
        true
    }

    /// Admit or reject one observation, treated as a batch of one.
    pub fn admit(&mut self, observation: &Observation) -> bool {
        self.admit_batch(std::slice::from_ref(observation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Payload;

    fn settlement(exchange: ExchangeId) -> Observation {
        Observation {
            exchange,
            symbol: jackbot_instrument::symbol::Symbol::normalize("BTCUSDT"),
            data_type: DataType::FundingSettlement,
            payload: Payload::FundingSettlement { funding_rate: 0.0001, settlement_ts: 0 },
            ingress_timestamp: 0,
        }
    }

    #[test]
    fn test_non_settlement_always_admitted() {
        let mut limiter = Stage0Limiter::new(1, Duration::from_secs(60));
        let ticker = Observation {
            exchange: ExchangeId::BinanceFuturesUsd,
            symbol: jackbot_instrument::symbol::Symbol::normalize("BTCUSDT"),
            data_type: DataType::Ticker,
            payload: Payload::Ticker { price: 1.0 },
            ingress_timestamp: 0,
        };
        for _ in 0..10 {
            assert!(limiter.admit(&ticker));
        }
    }

    #[test]
    fn test_okx_settlement_never_counted() {
        let mut limiter = Stage0Limiter::new(1, Duration::from_secs(60));
        for _ in 0..10 {
            assert!(limiter.admit(&settlement(ExchangeId::Okx)));
        }
    }

    #[test]
    fn test_blocks_after_limit_exceeded() {
        let mut limiter = Stage0Limiter::new(2, Duration::from_secs(60));
        let event = settlement(ExchangeId::BinanceFuturesUsd);
        assert!(limiter.admit(&event));
        assert!(limiter.admit(&event));
        assert!(!limiter.admit(&event));
        assert!(limiter.is_blocked());
    }

    #[test]
    fn test_reset_clears_block() {
        let mut limiter = Stage0Limiter::new(1, Duration::from_secs(60));
        let event = settlement(ExchangeId::BinanceFuturesUsd);
        limiter.admit(&event);
        assert!(!limiter.admit(&event));
        limiter.reset();
        assert!(limiter.admit(&event));
    }

    #[test]
    fn test_batch_of_many_rows_spends_a_single_unit() {
        let mut limiter = Stage0Limiter::new(2, Duration::from_secs(60));
        let batch: Vec<Observation> = (0..50).map(|_| settlement(ExchangeId::BinanceFuturesUsd)).collect();
        assert!(limiter.admit_batch(&batch));
        assert!(limiter.admit_batch(&batch));
        // third batch pushes the counter past the limit - rejected entirely.
        assert!(!limiter.admit_batch(&batch));
        assert!(limiter.is_blocked());
    }

    #[test]
    fn test_batch_that_reaches_the_limit_still_passes_through_entirely() {
        let mut limiter = Stage0Limiter::new(1, Duration::from_secs(60));
        let batch: Vec<Observation> = (0..50).map(|_| settlement(ExchangeId::BinanceFuturesUsd)).collect();
        assert!(limiter.admit_batch(&batch));
        assert!(limiter.is_blocked());
    }

    #[test]
    fn test_batch_with_no_qualifying_rows_always_admitted() {
        let mut limiter = Stage0Limiter::new(0, Duration::from_secs(60));
        let batch: Vec<Observation> = (0..10).map(|_| settlement(ExchangeId::Okx)).collect();
        assert!(limiter.admit_batch(&batch));
        assert!(!limiter.is_blocked());
    }
}
