use jackbot_data::config::Config;
use jackbot_data::historical::HistoricalFetcher;
use jackbot_data::http::{self, AppState};
use jackbot_data::manager::GlobalPoolManager;
use jackbot_data::pipeline::{
    stage1_filter::{self, FilterOutcome}, stage2_fuse::FuseStage,
    stage3_align::AlignStage, stage4_per_exchange::PerExchangeStage, stage5_cross,
};
use jackbot_data::store::{DataStore, Flow};
use jackbot_instrument::symbol::Symbol;
use jackbot_integration::channel::mpsc_unbounded;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    init_logging();

    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("failed to load config: {error}");
            std::process::exit(1);
        }
    };

    let symbols: Vec<Symbol> = config.symbols.iter().map(|s| Symbol::normalize(s)).collect();
    info!(?symbols, "starting jackbot market data engine");

    let store = DataStore::new();
    let (tx, observations) = mpsc_unbounded();
    let mut manager = GlobalPoolManager::new(&config, &symbols, tx.clone());

    if let Err(error) = manager.start().await {
        warn!(?error, "failed to start one or more exchange pools, continuing anyway");
    }

    let pool_status = Arc::new(RwLock::new(manager.status()));
    let historical = Arc::new(Mutex::new(HistoricalFetcher::new(
        tx,
        config.rate_limit.clone(),
        config.historical.clone(),
    )));

    let app_state = AppState {
        store: store.clone(),
        historical: historical.clone(),
        pool_status: pool_status.clone(),
        symbols: Arc::new(symbols.clone()),
    };

    let monitor_poll_interval = config.monitor.poll_interval;
    tokio::spawn(run_pipeline(observations, store.clone()));
    tokio::spawn(run_monitor_loop(manager, pool_status.clone(), monitor_poll_interval));
    tokio::spawn({
        let symbols = symbols.clone();
        async move { historical.lock().await.run(&symbols).await }
    });

    store.mark_http_server_ready();

    let addr = format!("0.0.0.0:{}", config.http.port);
    let listener = TcpListener::bind(&addr).await.expect("failed to bind HTTP listener");
    info!(%addr, "HTTP introspection server listening");

    let server = axum::serve(listener, http::router(app_state));
    if let Err(error) = server.with_graceful_shutdown(shutdown_signal()).await {
        warn!(?error, "HTTP server exited with error");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

/// Owns `manager` for the life of the process: ticks both exchanges'
/// monitors on `poll_interval` and republishes [`jackbot_data::manager::GlobalPoolStatus`]
/// into the shared `RwLock` the HTTP handler reads from.
async fn run_monitor_loop(
    mut manager: GlobalPoolManager,
    pool_status: Arc<RwLock<jackbot_data::manager::GlobalPoolStatus>>,
    poll_interval: std::time::Duration,
) {
    loop {
        tokio::time::sleep(poll_interval).await;
        if let Err(error) = manager.tick_monitors().await {
            warn!(?error, "monitor tick failed");
        }
        *pool_status.write().await = manager.status();
    }
}

/// Drain observations off the shared channel and drive them through the
/// five pipeline stages, storing every observation along the way.
///
/// Stage 0's batch-grained rate limiting happens upstream, at
/// [`jackbot_data::historical::HistoricalFetcher`] - the sole source of the
/// `funding_settlement` rows it guards - so this loop runs stages 1 through
/// 5 unconditionally on everything that reaches it.
async fn run_pipeline(
    mut observations: jackbot_integration::channel::UnboundedRx<jackbot_data::observation::Observation>,
    store: DataStore,
) {
    use tokio_stream::StreamExt;

    let mut stage2 = FuseStage::new();
    let mut stage3 = AlignStage::new();
    let mut stage4 = PerExchangeStage::new();

    while let Some(observation) = StreamExt::next(&mut observations).await {
        let flow = store.insert(observation.clone()).await;
        if flow != Flow::Pipeline {
            continue;
        }

        let now_ms = observation.ingress_timestamp;
        match stage1_filter::filter(observation) {
            FilterOutcome::Extracted(extracted) => {
                let Some(fused) = stage2.fuse(extracted, now_ms) else {
                    continue;
                };
                let Some(aligned) = stage3.align(fused, now_ms) else {
                    continue;
                };
                let metrics = stage4.compute(&aligned, now_ms);
                let signal = stage5_cross::cross(&aligned);
                info!(symbol = aligned.symbol.as_str(), ?metrics, ?signal, "pipeline emission");
            }
            FilterOutcome::Settlement {
                exchange,
                symbol,
                settlement_ts,
                ..
            } => {
                stage2.enrich_settlement(exchange, &symbol, settlement_ts);
            }
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
