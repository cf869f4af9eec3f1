//! Low-level framework for composing flexible web integrations with
//! financial exchanges: websocket transport, REST plumbing and a shared
//! rate limiter. No business logic lives here - `jackbot-data` builds the
//! market-data plane on top of these primitives.

/// Unbounded mpsc channel wrappers ([`channel::Tx`], [`channel::ChannelTxDroppable`]) used to
/// hand observations from a worker to its `data_callback`.
pub mod channel;

/// [`error::SocketError`] - the shared error type for transport and REST failures, and the
/// [`error::Unrecoverable`] marker trait.
pub mod error;

/// [`protocol::websocket::Connection`] and the HTTP REST client/request traits.
pub mod protocol;

/// Token-bucket [`rate_limit::RateLimiter`] with priority queues and adaptive backoff, used by
/// the historical-funding fetcher.
pub mod rate_limit;

/// [`snapshot::Snapshot`] - a thin wrapper marking a value as "the current one" for a key,
/// used by [`jackbot_data::store::DataStore`].
pub mod snapshot;
