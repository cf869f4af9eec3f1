use crate::observation::Observation;
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use jackbot_integration::protocol::websocket::WsMessage;
use std::time::Duration;
use url::Url;

/// Exchange-specific wire format handling for [`Binance`](binance::Binance) (EX-A).
pub mod binance;

/// Exchange-specific wire format handling for [`Okx`](okx::Okx) (EX-B).
pub mod okx;

/// Result of parsing one inbound text frame.
#[derive(Debug)]
pub enum ParseOutcome {
    /// A market-data event normalised into an [`Observation`].
    Data(Observation),
    /// A control frame (subscribe ack, id echo, error) - swallowed and logged.
    Control,
    /// Something we don't recognise at all.
    Unrecognized,
}

/// Translates one exchange's wire protocol into the exchange-agnostic
/// [`Observation`] model, and builds that exchange's subscribe requests.
///
/// This is the "static table instead of reflection" design referenced in
/// the system's design notes: `Worker` dispatches on `Connector::ID`
/// rather than matching on raw strings at every call site.
pub trait Connector: Send + Sync + 'static {
    const ID: ExchangeId;

    /// Heartbeat-only symbol a [`crate::worker::BackupWorker`] subscribes to.
    const HEARTBEAT_SYMBOL: &'static str;

    fn url() -> Url;

    fn ping_interval() -> Duration;

    /// Build the subscribe request for up to 50 symbols at a time - see
    /// `Worker::subscribe` for the batching loop.
    fn subscribe_request(symbols: &[Symbol]) -> WsMessage;

    /// Build the unsubscribe request for the given symbols.
    fn unsubscribe_request(symbols: &[Symbol]) -> WsMessage;

    /// Parse one inbound text frame.
    fn parse(raw: &str) -> ParseOutcome;
}
