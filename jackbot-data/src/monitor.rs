use crate::config::MonitorConfig;
use crate::exchange::Connector;
use crate::pool::{ExchangePool, Slot};
use crate::worker::WorkerRole;
use jackbot_integration::error::SocketError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Watches an [`ExchangePool`]'s shards for a disconnected or stalled data
/// worker and fails them over to their warm backup.
///
/// Failover protocol, per shard:
/// 1. Data worker is disconnected, or its last message is older than
///    `disconnect_threshold`.
/// 2. The shard's slot is not cooling down from a prior failover.
/// 3. The backup worker must be connected (ready) or the failover is skipped
///    and retried next tick - there is nothing useful to promote.
/// 4. Promote backup to data (drops heartbeat subscription, takes over the
///    shard's symbol partition).
/// 5. Demote the old data worker and spin up a fresh backup in its place.
/// 6. Both the (exchange, Data, index) and (exchange, Backup, index) slots
///    enter cooldown so a still-settling connection can't immediately
///    trigger a second failover.
pub struct MonitorCenter {
    disconnect_threshold: Duration,
    slot_cooldown: Duration,
    poll_interval: Duration,
    cooldown_until: HashMap<Slot, Instant>,
}

impl MonitorCenter {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            disconnect_threshold: config.disconnect_threshold,
            slot_cooldown: config.slot_cooldown,
            poll_interval: config.poll_interval,
            cooldown_until: HashMap::new(),
        }
    }

    pub fn is_cooling_down(&self, slot: Slot) -> bool {
        self.cooldown_until
            .get(&slot)
            .is_some_and(|until| Instant::now() < *until)
    }

    fn enter_cooldown(&mut self, slot: Slot) {
        self.cooldown_until.insert(slot, Instant::now() + self.slot_cooldown);
    }

    /// Run one supervision pass over every shard in `pool`, failing over
    /// any shard whose data worker has disconnected or gone stale, provided
    /// its backup is ready and it isn't cooling down.
    ///
    /// A shard whose failover fails is logged and skipped rather than
    /// aborting the pass - the remaining stale shards still get their
    /// chance to fail over this tick.
    pub async fn tick<C: Connector>(&mut self, pool: &mut ExchangePool<C>) -> Result<(), SocketError> {
        let stale_indices: Vec<usize> = pool
            .shards
            .iter()
            .filter(|shard| {
                let data_slot = shard.data_slot();
                if self.is_cooling_down(data_slot) {
                    return false;
                }
                let disconnected = !shard.data.is_connected();
                let stale = shard.data.last_message_age() > self.disconnect_threshold;
                (disconnected || stale) && shard.backup.is_connected()
            })
            .map(|shard| shard.index)
            .collect();

        for index in stale_indices {
            let data_slot = (C::ID, WorkerRole::Data, index);
            let backup_slot = (C::ID, WorkerRole::Backup, index);
            warn!(exchange = ?C::ID, shard = index, "data worker stale or disconnected, failing over");
            if let Err(error) = pool.failover_shard(index).await {
                warn!(exchange = ?C::ID, shard = index, ?error, "failover failed, will retry next tick");
                continue;
            }
            self.enter_cooldown(data_slot);
            self.enter_cooldown(backup_slot);
            info!(exchange = ?C::ID, shard = index, "failover complete");
        }
        Ok(())
    }

    /// Supervise `pool` forever, sleeping `poll_interval` between ticks.
    pub async fn run<C: Connector>(&mut self, pool: &mut ExchangePool<C>) {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            if let Err(error) = self.tick(pool).await {
                warn!(?error, exchange = ?C::ID, "monitor tick failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_expires() {
        let mut monitor = MonitorCenter::new(&MonitorConfig {
            disconnect_threshold: Duration::from_secs(45),
            slot_cooldown: Duration::from_millis(1),
            poll_interval: Duration::from_secs(5),
        });
        let slot = (jackbot_instrument::exchange::ExchangeId::Okx, WorkerRole::Data, 0);
        monitor.enter_cooldown(slot);
        assert!(monitor.is_cooling_down(slot));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!monitor.is_cooling_down(slot));
    }

    #[test]
    fn test_unseen_slot_not_cooling_down() {
        let monitor = MonitorCenter::new(&MonitorConfig {
            disconnect_threshold: Duration::from_secs(45),
            slot_cooldown: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
        });
        let slot = (jackbot_instrument::exchange::ExchangeId::BinanceFuturesUsd, WorkerRole::Backup, 3);
        assert!(!monitor.is_cooling_down(slot));
    }
}
