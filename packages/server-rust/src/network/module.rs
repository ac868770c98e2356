//! Network module with deferred startup lifecycle.
//!
//! `new()` wires the dispatch pipeline, `start()` binds the TCP listener and
//! `serve()` accepts connections until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use axum::routing::{get, post};
use axum::Router;
use kairpc_core::Registry;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    health_handler, liveness_handler, readiness_handler, rpc_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::service::{build_dispatch_pipeline, ServerConfig};

/// Manages the HTTP server lifecycle around a populated [`Registry`].
///
/// 1. `new()` -- builds the dispatch pipeline and shutdown controller
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- serves until shutdown is signalled, then drains
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    state: AppState,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, server_config: ServerConfig, registry: Arc<Registry>) -> Self {
        let shutdown = Arc::new(ShutdownController::new());
        let state = AppState {
            dispatcher: build_dispatch_pipeline(
                Arc::clone(&registry),
                Arc::clone(&shutdown),
                &server_config,
            ),
            registry,
            shutdown,
            config: Arc::new(config.clone()),
            start_time: Instant::now(),
        };
        Self {
            config,
            listener: None,
            state,
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    /// - `POST <endpoint_path>` -- dispatch endpoint
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route(&self.config.endpoint_path, post(rpc_handler))
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then drains in-flight
    /// dispatches for up to the configured drain timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();
        let shutdown_ctrl = Arc::clone(&self.state.shutdown);

        shutdown_ctrl.set_ready();
        info!(endpoint = %self.config.endpoint_path, "serving dispatch endpoint");

        let signal_ctrl = Arc::clone(&shutdown_ctrl);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                signal_ctrl.trigger_shutdown();
            })
            .await?;

        if shutdown_ctrl.wait_for_drain(self.config.drain_timeout).await {
            info!("All dispatches drained");
        } else {
            warn!(
                in_flight = shutdown_ctrl.in_flight_count(),
                "Drain timeout expired with dispatches still running"
            );
        }
        Ok(())
    }
}
