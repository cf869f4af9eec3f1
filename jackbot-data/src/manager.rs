use crate::config::Config;
use crate::exchange::binance::Binance;
use crate::exchange::okx::Okx;
use crate::monitor::MonitorCenter;
use crate::observation::Observation;
use crate::pool::ExchangePool;
use crate::worker::WorkerStatus;
use jackbot_instrument::symbol::Symbol;
use jackbot_integration::channel::UnboundedTx;
use jackbot_integration::error::SocketError;
use tracing::info;

/// Admin facade owning every exchange's [`ExchangePool`] and
/// [`MonitorCenter`]. The single entry point `jackbot`'s `main` uses to
/// start, stop and introspect the whole market-data plane.
pub struct GlobalPoolManager {
    binance: ExchangePool<Binance>,
    okx: ExchangePool<Okx>,
    binance_monitor: MonitorCenter,
    okx_monitor: MonitorCenter,
}

impl GlobalPoolManager {
    /// Build pools for both exchanges, partitioning `symbols` across each
    /// exchange's configured shard count. `tx` is the sending end of the
    /// shared observation channel - the caller owns the channel so it can
    /// also hand a clone to other observation sources (eg
    /// [`crate::historical::HistoricalFetcher`]).
    pub fn new(config: &Config, symbols: &[Symbol], tx: UnboundedTx<Observation>) -> Self {
        let binance = ExchangePool::<Binance>::new(config.pool.binance_shards, symbols, tx.clone());
        let okx = ExchangePool::<Okx>::new(config.pool.okx_shards, symbols, tx);

        Self {
            binance,
            okx,
            binance_monitor: MonitorCenter::new(&config.monitor),
            okx_monitor: MonitorCenter::new(&config.monitor),
        }
    }

    pub async fn start(&mut self) -> Result<(), SocketError> {
        info!("starting Binance exchange pool");
        self.binance.start().await?;
        info!("starting OKX exchange pool");
        self.okx.start().await?;
        Ok(())
    }

    pub async fn stop(&mut self) {
        self.binance.stop().await;
        self.okx.stop().await;
    }

    /// Run both exchanges' [`MonitorCenter`]s concurrently until cancelled.
    pub async fn run_monitors(&mut self) {
        let Self {
            binance,
            okx,
            binance_monitor,
            okx_monitor,
        } = self;
        tokio::join!(binance_monitor.run(binance), okx_monitor.run(okx));
    }

    /// Run one supervision pass over both exchanges' shards. Intended for a
    /// caller that also wants to snapshot [`Self::status`] on the same
    /// cadence, rather than [`Self::run_monitors`]'s own internal loop.
    pub async fn tick_monitors(&mut self) -> Result<(), SocketError> {
        self.binance_monitor.tick(&mut self.binance).await?;
        self.okx_monitor.tick(&mut self.okx).await?;
        Ok(())
    }

    pub fn status(&self) -> GlobalPoolStatus {
        GlobalPoolStatus {
            binance: self.binance.status(),
            okx: self.okx.status(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GlobalPoolStatus {
    pub binance: Vec<(usize, WorkerStatus, WorkerStatus)>,
    pub okx: Vec<(usize, WorkerStatus, WorkerStatus)>,
}
