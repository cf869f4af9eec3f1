use crate::historical::HistoricalFetcher;
use crate::manager::GlobalPoolStatus;
use crate::store::DataStore;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use jackbot_instrument::symbol::Symbol;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;

/// Shared state for the HTTP introspection plane. Cheap to clone - every
/// field is already reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub store: DataStore,
    pub historical: Arc<Mutex<HistoricalFetcher>>,
    pub pool_status: Arc<RwLock<GlobalPoolStatus>>,
    pub symbols: Arc<Vec<Symbol>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/funding/settlement/public", get(funding_settlement_public))
        .route("/api/funding/settlement/status", get(funding_settlement_status))
        .route("/api/funding/settlement/fetch", post(funding_settlement_fetch))
        .route("/api/debug/store", get(debug_store))
        .route("/api/monitor/health", get(monitor_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct SettlementEntry {
    symbol: String,
    funding_rate: f64,
    settlement_ts: i64,
}

async fn funding_settlement_public(State(state): State<AppState>) -> Json<Vec<SettlementEntry>> {
    let snapshot = state.store.snapshot().await;
    let entries = snapshot
        .into_iter()
        .filter_map(|observation| match observation.payload {
            crate::observation::Payload::FundingSettlement { funding_rate, settlement_ts } => {
                Some(SettlementEntry {
                    symbol: observation.symbol.to_string(),
                    funding_rate,
                    settlement_ts,
                })
            }
            _ => None,
        })
        .collect();
    Json(entries)
}

#[derive(Serialize)]
struct SettlementStatus {
    hard_stopped: bool,
    http_server_ready: bool,
}

async fn funding_settlement_status(State(state): State<AppState>) -> Json<SettlementStatus> {
    let hard_stopped = state.historical.lock().await.is_hard_stopped();
    Json(SettlementStatus {
        hard_stopped,
        http_server_ready: state.store.is_http_server_ready(),
    })
}

async fn funding_settlement_fetch(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let mut fetcher = state.historical.lock().await;
    match fetcher.trigger_manual(&state.symbols).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(serde_json::json!({"status": "triggered"}))),
        Err(error) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({"status": "rejected", "reason": error.to_string()})),
        ),
    }
}

async fn debug_store(State(state): State<AppState>) -> Json<usize> {
    Json(state.store.snapshot().await.len())
}

async fn monitor_health(State(state): State<AppState>) -> Json<GlobalPoolStatus> {
    Json((*state.pool_status.read().await).clone())
}
