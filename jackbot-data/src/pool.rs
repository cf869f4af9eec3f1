use crate::exchange::Connector;
use crate::observation::Observation;
use crate::worker::{Worker, WorkerRole, WorkerStatus};
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use jackbot_integration::channel::UnboundedTx;
use jackbot_integration::error::SocketError;
use tracing::info;

/// Stable identity of one worker slot: an exchange, a role, and a shard
/// index. Used by [`crate::monitor::MonitorCenter`] to track per-slot
/// cooldowns across failovers.
pub type Slot = (ExchangeId, WorkerRole, usize);

/// One data/backup worker pair plus the symbol partition it owns.
pub struct Shard<C: Connector> {
    pub index: usize,
    pub symbols: Vec<Symbol>,
    pub data: Worker<C>,
    pub backup: Worker<C>,
}

impl<C: Connector> Shard<C> {
    pub fn new(index: usize, out: UnboundedTx<Observation>) -> Self {
        Self {
            index,
            symbols: Vec::new(),
            data: Worker::new(WorkerRole::Data, out.clone()),
            backup: Worker::new(WorkerRole::Backup, out),
        }
    }

    /// Connect both workers and subscribe the data worker to this shard's
    /// symbol partition. The backup worker is already heartbeat-subscribed
    /// by [`Worker::start`].
    pub async fn start(&mut self) -> Result<(), SocketError> {
        self.data.start().await?;
        self.backup.start().await?;
        if !self.symbols.is_empty() {
            self.data.subscribe(&self.symbols).await?;
        }
        Ok(())
    }

    pub async fn stop(&mut self) {
        self.data.stop().await;
        self.backup.stop().await;
    }

    /// Promote the backup worker into the data role, taking over this
    /// shard's symbol partition, then demote the old data worker.
    ///
    /// If promotion fails, the backup never takes over: the old data worker
    /// is stopped and a fresh `BackupWorker` replaces the failed one, but
    /// the Data slot is left disconnected rather than swapped in. The next
    /// monitor tick sees it as still stale and retries.
    pub async fn failover(&mut self) -> Result<(), SocketError> {
        if let Err(error) = self.backup.promote(&self.symbols).await {
            self.data.stop().await;
            self.backup = Worker::new(WorkerRole::Backup, clone_out(&self.data));
            return Err(error);
        }
        self.data.stop().await;
        std::mem::swap(&mut self.data, &mut self.backup);
        self.backup = Worker::new(WorkerRole::Backup, clone_out(&self.data));
        self.backup.start().await?;
        Ok(())
    }

    pub fn data_slot(&self) -> Slot {
        (C::ID, WorkerRole::Data, self.index)
    }

    pub fn backup_slot(&self) -> Slot {
        (C::ID, WorkerRole::Backup, self.index)
    }
}

fn clone_out(worker: &Worker<impl Connector>) -> UnboundedTx<Observation> {
    worker.out_handle()
}

/// Partitions an exchange's symbol universe across `shard_count` shards and
/// owns each shard's [`Worker`] pair.
pub struct ExchangePool<C: Connector> {
    pub shards: Vec<Shard<C>>,
}

impl<C: Connector> ExchangePool<C> {
    pub fn new(shard_count: usize, symbols: &[Symbol], out: UnboundedTx<Observation>) -> Self {
        let shard_count = shard_count.max(1);
        let mut shards: Vec<Shard<C>> = (0..shard_count)
            .map(|index| Shard::new(index, out.clone()))
            .collect();

        for (index, symbol) in symbols.iter().enumerate() {
            shards[index % shard_count].symbols.push(symbol.clone());
        }

        Self { shards }
    }

    pub async fn start(&mut self) -> Result<(), SocketError> {
        for shard in &mut self.shards {
            shard.start().await?;
        }
        Ok(())
    }

    pub async fn stop(&mut self) {
        for shard in &mut self.shards {
            shard.stop().await;
        }
    }

    pub async fn failover_shard(&mut self, index: usize) -> Result<(), SocketError> {
        let Some(shard) = self.shards.get_mut(index) else {
            return Ok(());
        };
        info!(exchange = ?C::ID, shard = index, "failing over shard");
        shard.failover().await
    }

    pub fn status(&self) -> Vec<(usize, WorkerStatus, WorkerStatus)> {
        self.shards
            .iter()
            .map(|s| (s.index, s.data.status(), s.backup.status()))
            .collect()
    }
}
