//! HTTP server setup.

use super::{handlers::AppState, routes::create_router};
use crate::errors::{EngineError, EngineResult};
use axum::http::HeaderName;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer, ExposeHeaders},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

pub struct EngineServer {
    state: Arc<AppState>,
}

impl EngineServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Bind and serve until a shutdown signal arrives.
    pub async fn run(self) -> EngineResult<()> {
        let addr = self.socket_addr()?;
        let app = self.create_app();

        info!("Starting skinfall engine server");
        info!("   Listen: http://{}", addr);
        self.log_endpoints();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped gracefully");
        Ok(())
    }

    fn create_app(&self) -> axum::Router {
        let server = &self.state.config.server;
        create_router(self.state.clone())
            // CORS before timeout so preflights are answered
            .layer(create_cors_layer(server.cors_origins.clone()))
            .layer(TimeoutLayer::new(Duration::from_secs(
                server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> EngineResult<SocketAddr> {
        let server = &self.state.config.server;
        let ip = server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| EngineError::Configuration(format!("Invalid host: {}", e)))?;
        Ok(SocketAddr::from((ip, server.port)))
    }

    fn log_endpoints(&self) {
        info!("Available endpoints:");
        info!("   GET    /health                    - Health check");
        info!("   POST   /user/register             - Create account");
        info!("   GET    /user/me                   - Account profile");
        info!("   POST   /user/bonus                - Claim periodic bonus");
        info!("   PUT    /user/fixedItem            - Pin an inventory item");
        info!("   GET    /game/cases                - Case catalog");
        info!("   POST   /game/openCase/:id         - Open cases");
        info!("   POST   /game/slots                - Spin the slot machine");
        info!("   POST   /game/upgrade              - Roll an item upgrade");
        info!("   GET    /game/coinflip             - Current round snapshot");
        info!("   GET    /marketplace/              - Open listings");
        info!("   POST   /marketplace/              - List an item");
        info!("   POST   /marketplace/buy/:id       - Buy a listing");
        info!("   DELETE /marketplace/:id           - Cancel a listing");
        info!("   GET    /ws                        - Real-time events");
    }
}

/// Permissive in development; restricted to configured origins otherwise.
fn create_cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let exposed = ExposeHeaders::list([HeaderName::from_static("content-type")]);
    if allowed_origins.is_empty() || allowed_origins.contains(&"*".to_string()) {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed)
    } else {
        CorsLayer::new()
            .allow_origin(
                allowed_origins
                    .into_iter()
                    .filter_map(|origin| origin.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::DELETE,
            ])
            .allow_headers(Any)
            .expose_headers(exposed)
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
