//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{domain::MessagePusher, usecase::SessionOrchestrator};

use super::{
    handler::{get_sessions, get_voice_connections, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Focus session server
///
/// This struct encapsulates the server configuration and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(orchestrator, message_pusher, token);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// SessionOrchestrator（コマンド実行のユースケース）
    orchestrator: Arc<SessionOrchestrator>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// Shared secret for WebSocket clients
    token: String,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - UseCase that runs client commands
    /// * `message_pusher` - Delivers session events to connected clients
    /// * `token` - Shared secret clients must present on connect
    pub fn new(
        orchestrator: Arc<SessionOrchestrator>,
        message_pusher: Arc<dyn MessagePusher>,
        token: String,
    ) -> Self {
        Self {
            orchestrator,
            message_pusher,
            token,
        }
    }

    /// Build the router with all endpoints
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            orchestrator: self.orchestrator.clone(),
            message_pusher: self.message_pusher.clone(),
            token: self.token.clone(),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/sessions", get(get_sessions))
            .route("/api/voice", get(get_voice_connections))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the server until Ctrl+C
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then release every session
    /// and voice connection.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let local_addr = listener.local_addr()?;

        tracing::info!("Focus session server listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/ws", local_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        // Stop accepting commands first, then cancel timers and release voice
        self.orchestrator.shutdown().await;
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
