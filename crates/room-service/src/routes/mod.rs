//! HTTP routes for Room Service.
//!
//! Defines the Axum router and application state.

use crate::auth::SessionSigner;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_membership, AuthState};
use crate::services::{
    AdmissionController, EventChannel, EventDispatcher, MessageLog, RoomRegistry,
};
use crate::store::RoomStore;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Store adapter (Redis or in-memory).
    pub store: Arc<dyn RoomStore>,

    pub registry: RoomRegistry,
    pub admission: AdmissionController,
    pub messages: MessageLog,
    pub dispatcher: EventDispatcher,

    /// Session cookie signer.
    pub session: SessionSigner,

    /// Cancelled on shutdown; ends open realtime streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the services over a store and an event channel.
    pub fn new(config: Config, store: Arc<dyn RoomStore>, events: Arc<dyn EventChannel>) -> Self {
        let dispatcher = EventDispatcher::new(events);
        let registry = RoomRegistry::new(
            Arc::clone(&store),
            dispatcher.clone(),
            Duration::from_secs(config.room_ttl_seconds),
        );
        let session = SessionSigner::new(
            config.session_secret.clone(),
            config.session_cookie_secure,
        );

        Self {
            admission: AdmissionController::new(Arc::clone(&store)),
            messages: MessageLog::new(Arc::clone(&store)),
            registry,
            dispatcher,
            session,
            store,
            config,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Store liveness - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/room/create` - Create a room - public
/// - `/room/:room_id` - Admission gate - public, issues the session cookie
/// - `/api/room/ttl`, `/api/room`, `/api/messages` - membership required
/// - `/api/realtime` - SSE stream, membership required, exempt from the
///   request timeout
/// - TraceLayer for request logging
/// - HTTP metrics middleware
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        admission: state.admission.clone(),
        session: state.session.clone(),
    });
    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds);

    // Public routes (no membership required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/room/create", post(handlers::create_room))
        .route("/room/:room_id", get(handlers::enter_room))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Room-scoped routes (membership required)
    let member_routes = Router::new()
        .route("/api/room/ttl", get(handlers::get_ttl))
        .route(
            "/api/room",
            get(handlers::get_room_info).delete(handlers::destroy_room),
        )
        .route(
            "/api/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_membership,
        ))
        .with_state(state.clone());

    // Long-lived stream: same guard, no timeout
    let realtime_routes = Router::new()
        .route("/api/realtime", get(handlers::subscribe))
        .route_layer(middleware::from_fn_with_state(
            auth_state,
            require_membership,
        ))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - request/response routes only (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(member_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .merge(metrics_routes)
        .merge(realtime_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
