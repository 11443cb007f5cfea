//! Room Service
//!
//! Entry point for the ephemeral chat room server.

use room_service::config::{Config, StoreBackend};
use room_service::observability::metrics::init_metrics_recorder;
use room_service::routes::{self, AppState};
use room_service::services::{BroadcastEventChannel, EventChannel};
use room_service::store::{MemoryRoomStore, RedisRoomStore, RoomStore};
use room_service::tasks::start_expiry_reaper;
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Room Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        store_backend = ?config.store_backend,
        room_ttl_seconds = config.room_ttl_seconds,
        "Configuration loaded successfully"
    );

    // Install the Prometheus recorder before anything records a metric
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Select the store backend
    let (store, memory_store): (Arc<dyn RoomStore>, Option<MemoryRoomStore>) =
        match config.store_backend {
            StoreBackend::Redis => {
                let redis_url = config
                    .redis_url
                    .as_ref()
                    .ok_or("REDIS_URL is required for the redis store")?;
                info!("Connecting to Redis...");
                let store = RedisRoomStore::connect(redis_url.expose_secret()).await?;
                info!("Redis connection established");
                (Arc::new(store), None)
            }
            StoreBackend::Memory => {
                warn!("Using in-memory store; room state is lost on restart");
                let store = MemoryRoomStore::new();
                (Arc::new(store.clone()), Some(store))
            }
        };

    let events: Arc<dyn EventChannel> =
        Arc::new(BroadcastEventChannel::new(config.event_buffer_capacity));

    let bind_address = config.bind_address.clone();
    let reaper_interval = Duration::from_secs(config.reaper_interval_seconds);

    let state = Arc::new(AppState::new(config, store, Arc::clone(&events)));
    let shutdown_token = state.shutdown.clone();

    // Background expiry sweep (in-memory keys, idle event channels)
    let reaper_token = CancellationToken::new();
    let reaper_handle = tokio::spawn(start_expiry_reaper(
        memory_store,
        events,
        reaper_interval,
        reaper_token.clone(),
    ));

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Room Service listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_token))
    .await?;

    reaper_token.cancel();
    if let Err(e) = reaper_handle.await {
        warn!("Expiry reaper did not shut down cleanly: {}", e);
    }

    info!("Room Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
///
/// On signal, ends open realtime streams, then waits out the drain period so
/// in-flight requests can complete.
async fn shutdown_signal(streams: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    // SSE connections would otherwise hold the server open indefinitely
    streams.cancel();

    let drain_secs: u64 = std::env::var("DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}
