//! Test server harness for E2E testing
//!
//! Provides `TestRoomServer` for spawning real Room Service instances in tests.

use crate::fixtures::test_vars;
use crate::mock_events::RecordingEventChannel;
use metrics_exporter_prometheus::PrometheusBuilder;
use room_service::config::Config;
use room_service::routes::{self, AppState};
use room_service::store::MemoryRoomStore;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning Room Service in E2E tests.
///
/// The server runs the production router over a [`MemoryRoomStore`] and a
/// [`RecordingEventChannel`], both reachable from the test.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let server = TestRoomServer::spawn().await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestRoomServer {
    addr: SocketAddr,
    config: Config,
    store: MemoryRoomStore,
    events: Arc<RecordingEventChannel>,
    _handle: JoinHandle<()>,
}

impl TestRoomServer {
    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(HashMap::new()).await
    }

    /// Spawn a server, overriding individual environment variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(overrides: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let mut vars = test_vars();
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let store = MemoryRoomStore::new();
        let events = Arc::new(RecordingEventChannel::new());

        let state = Arc::new(AppState::new(
            config.clone(),
            Arc::new(store.clone()),
            events.clone(),
        ));

        // Each test server gets its own, uninstalled recorder
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            store,
            events,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store backing the server.
    pub fn store(&self) -> &MemoryRoomStore {
        &self.store
    }

    /// The event channel backing the server.
    pub fn events(&self) -> &RecordingEventChannel {
        &self.events
    }
}

impl Drop for TestRoomServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestRoomServer::spawn().await?;
        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["store"], "memory");

        Ok(())
    }

    #[tokio::test]
    async fn test_overrides_apply() -> Result<(), anyhow::Error> {
        let server = TestRoomServer::spawn_with(HashMap::from([(
            "ROOM_TTL_SECONDS".to_string(),
            "5".to_string(),
        )]))
        .await?;

        assert_eq!(server.config().room_ttl_seconds, 5);
        assert!(server.addr().ip().is_loopback());
        Ok(())
    }
}
