//! Real-time market-data aggregation and cross-exchange funding-rate
//! arbitrage signal engine for Binance USDⓈ-M Futures (EX-A) and OKX (EX-B)
//! perpetual swaps.
//!
//! [`manager::GlobalPoolManager`] owns a [`pool::ExchangePool`] per
//! exchange; each shard's [`worker::Worker`] pair feeds a shared channel
//! into [`store::DataStore`], whose `Pipeline`-routed observations flow
//! through the five [`pipeline`] stages into a cross-exchange signal.
//! [`historical::HistoricalFetcher`] backfills realised funding payments on
//! the side, and [`http`] exposes it all for introspection.

pub mod config;
pub mod error;
pub mod exchange;
pub mod historical;
pub mod http;
pub mod manager;
pub mod monitor;
pub mod observation;
pub mod pipeline;
pub mod pool;
pub mod store;
pub mod worker;
