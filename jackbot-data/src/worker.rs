use crate::exchange::{Connector, ParseOutcome};
use crate::observation::Observation;
use jackbot_instrument::symbol::Symbol;
use jackbot_integration::channel::{Tx, UnboundedTx};
use jackbot_integration::error::SocketError;
use jackbot_integration::protocol::websocket::{Connection, ConnectionConfig};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{info, warn};

/// The role a [`Worker`] plays within its [`crate::pool::Shard`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WorkerRole {
    /// Owns the shard's live symbol set and feeds the [`crate::store::DataStore`].
    Data,
    /// Holds a warm connection subscribed only to the exchange's heartbeat
    /// symbol, ready to be promoted if the data worker disconnects.
    Backup,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize)]
pub enum WorkerStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// One websocket connection to one exchange, owned exclusively by its
/// [`crate::pool::Shard`]. Generic over [`Connector`] so subscribe/parse
/// logic is a compile-time dispatch, never a runtime match on exchange id.
pub struct Worker<C: Connector> {
    _connector: PhantomData<C>,
    role: WorkerRole,
    connection: Connection,
    subscribed: HashSet<Symbol>,
    status: WorkerStatus,
    batch_size: usize,
    batch_pause: Duration,
    out: UnboundedTx<Observation>,
}

impl<C: Connector> Worker<C> {
    pub fn new(role: WorkerRole, out: UnboundedTx<Observation>) -> Self {
        let config = ConnectionConfig {
            ping_interval: C::ping_interval(),
            ..ConnectionConfig::default()
        };
        Self {
            _connector: PhantomData,
            role,
            connection: Connection::new(C::url(), config),
            subscribed: HashSet::new(),
            status: WorkerStatus::Disconnected,
            batch_size: 50,
            batch_pause: Duration::from_secs(1),
            out,
        }
    }

    pub fn with_batching(mut self, batch_size: usize, batch_pause: Duration) -> Self {
        self.batch_size = batch_size;
        self.batch_pause = batch_pause;
        self
    }

    pub fn role(&self) -> WorkerRole {
        self.role
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn is_subscribed(&self, symbol: &Symbol) -> bool {
        self.subscribed.contains(symbol)
    }

    pub fn last_message_age(&self) -> Duration {
        self.connection.last_message_age()
    }

    /// Clone a handle to this worker's output channel, for constructing a
    /// replacement worker after a failover swap.
    pub fn out_handle(&self) -> UnboundedTx<Observation> {
        self.out.clone()
    }

    /// Connect. A [`WorkerRole::Backup`] immediately subscribes to the
    /// exchange's heartbeat symbol to keep its connection warm.
    pub async fn start(&mut self) -> Result<(), SocketError> {
        self.status = WorkerStatus::Connecting;
        self.connection.connect().await?;
        self.status = WorkerStatus::Connected;

        if matches!(self.role, WorkerRole::Backup) {
            let heartbeat = Symbol::normalize(C::HEARTBEAT_SYMBOL);
            self.subscribe(&[heartbeat]).await?;
        }
        Ok(())
    }

    pub async fn stop(&mut self) {
        self.connection.disconnect().await;
        self.subscribed.clear();
        self.status = WorkerStatus::Disconnected;
    }

    /// Subscribe to `symbols`, batching at `batch_size` symbols per request
    /// with a `batch_pause` between batches, per the exchange's rate limits.
    pub async fn subscribe(&mut self, symbols: &[Symbol]) -> Result<(), SocketError> {
        for (index, chunk) in symbols.chunks(self.batch_size.max(1)).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_pause).await;
            }
            self.connection.send(C::subscribe_request(chunk)).await?;
            self.subscribed.extend(chunk.iter().cloned());
        }
        Ok(())
    }

    pub async fn unsubscribe_all(&mut self) -> Result<(), SocketError> {
        let symbols: Vec<_> = self.subscribed.iter().cloned().collect();
        for chunk in symbols.chunks(self.batch_size.max(1)) {
            self.connection.send(C::unsubscribe_request(chunk)).await?;
        }
        self.subscribed.clear();
        Ok(())
    }

    /// Promote a [`WorkerRole::Backup`] into the data role: drop the
    /// heartbeat-only subscription and take over the full symbol set.
    pub async fn promote(&mut self, symbols: &[Symbol]) -> Result<(), SocketError> {
        self.unsubscribe_all().await?;
        self.role = WorkerRole::Data;
        self.subscribe(symbols).await
    }

    /// Receive and parse one inbound frame. `Ok(None)` on graceful close;
    /// `Err` flips [`Self::is_connected`] false - the owning shard reacts.
    pub async fn recv(&mut self) -> Result<Option<ParseOutcome>, SocketError> {
        match self.connection.recv_text().await? {
            Some(text) => Ok(Some(C::parse(&text))),
            None => Ok(None),
        }
    }

    /// Forward one already-parsed data observation downstream.
    pub fn forward(&self, observation: Observation) {
        self.out.send(observation);
    }

    /// Run the receive loop until the connection drops. Parsed [`Observation`]s
    /// are forwarded via the output channel; control/unrecognized frames are
    /// swallowed (already logged at parse time).
    pub async fn run(&mut self) -> Result<(), SocketError> {
        loop {
            match self.recv().await? {
                Some(ParseOutcome::Data(observation)) => self.forward(observation),
                Some(ParseOutcome::Control) | Some(ParseOutcome::Unrecognized) => {}
                None => {
                    info!(role = ?self.role, "connection closed gracefully");
                    self.status = WorkerStatus::Disconnected;
                    return Ok(());
                }
            }
        }
    }
}

impl<C: Connector> Drop for Worker<C> {
    fn drop(&mut self) {
        if self.connection.is_connected() {
            warn!(role = ?self.role, "worker dropped while still connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_worker_starts_disconnected() {
        let (tx, _rx) = jackbot_integration::channel::mpsc_unbounded();
        let worker = Worker::<crate::exchange::binance::Binance>::new(WorkerRole::Data, tx);
        assert_eq!(worker.status(), WorkerStatus::Disconnected);
        assert!(!worker.is_connected());
    }

    #[test]
    fn test_batching_config_applied() {
        let (tx, _rx) = jackbot_integration::channel::mpsc_unbounded();
        let worker = Worker::<crate::exchange::okx::Okx>::new(WorkerRole::Backup, tx)
            .with_batching(10, Duration::from_millis(500));
        assert_eq!(worker.batch_size, 10);
        assert_eq!(worker.batch_pause, Duration::from_millis(500));
    }
}
