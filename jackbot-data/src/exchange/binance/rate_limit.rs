use jackbot_integration::rate_limit::{Priority, RateLimiter};
use std::time::Duration;

/// Binance API rate limiter for REST and WebSocket usage.
#[derive(Clone)]
pub struct BinanceRateLimit {
    rest: RateLimiter,
    ws: RateLimiter,
}

impl BinanceRateLimit {
    /// Create a new [`BinanceRateLimit`] using placeholder quotas.
    ///
    /// REST: 1200 requests per minute.
    /// WebSocket: 5 subscribe messages per second.
    pub fn new() -> Self {
        Self::with_params(1200, Duration::from_secs(60), 5, Duration::from_secs(1))
    }

    /// Create a custom [`BinanceRateLimit`] with provided quotas, for testing.
    pub fn with_params(
        rest_capacity: usize,
        rest_interval: Duration,
        ws_capacity: usize,
        ws_interval: Duration,
    ) -> Self {
        Self {
            rest: RateLimiter::new(rest_capacity, rest_interval),
            ws: RateLimiter::new(ws_capacity, ws_interval),
        }
    }

    /// Acquire a REST permit with the specified [`Priority`].
    pub async fn acquire_rest(&self, priority: Priority) {
        self.rest.acquire(priority).await;
    }

    /// Acquire a WebSocket permit with the specified [`Priority`].
    pub async fn acquire_ws(&self, priority: Priority) {
        self.ws.acquire(priority).await;
    }

    /// Report a REST rate limit violation (eg/ an HTTP 429).
    pub async fn report_rest_violation(&self) {
        self.rest.report_violation().await;
    }
}

impl Default for BinanceRateLimit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jackbot_integration::rate_limit::Priority;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_rest_limit_exhaustion() {
        let rl = BinanceRateLimit::with_params(1, Duration::from_millis(40), 1, Duration::from_millis(40));
        rl.acquire_rest(Priority::Normal).await;
        let start = Instant::now();
        rl.acquire_rest(Priority::Normal).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_rest_backoff_doubles_interval() {
        let rl = BinanceRateLimit::with_params(1, Duration::from_millis(20), 1, Duration::from_millis(20));
        rl.acquire_rest(Priority::Normal).await;
        rl.report_rest_violation().await;
        let start = Instant::now();
        rl.acquire_rest(Priority::Normal).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
