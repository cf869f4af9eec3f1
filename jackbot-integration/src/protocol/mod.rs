/// Low-level HTTP REST request/response plumbing ([`http::rest::client::RestClient`]) shared by
/// every exchange's historical-data fetcher.
pub mod http;

/// The [`websocket::Connection`] transport: connect, send, receive, disconnect. No business
/// logic — see `jackbot_data::worker` for message interpretation.
pub mod websocket;
