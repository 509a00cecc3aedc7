//! Lookup server implementation

use std::net::SocketAddr;

use breach_core::LookupConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;

use crate::error::{Result, ServerError};
use crate::routes::create_router;
use crate::state::{create_shared_state, SharedState};

/// Breach lookup server
pub struct LookupServer {
    state: SharedState,
    addr: SocketAddr,
    allowed_origins: Vec<String>,
    prometheus: Option<PrometheusHandle>,
}

impl LookupServer {
    /// Run until Ctrl-C, then close sources
    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state.clone(), self.prometheus, &self.allowed_origins);

        tracing::info!("Starting breach lookup server on {}", self.addr);

        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        self.state.shutdown().await;
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the server state for testing
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Builder for LookupServer
pub struct ServerBuilder {
    config: LookupConfig,
    addr: SocketAddr,
    prometheus: Option<PrometheusHandle>,
}

impl ServerBuilder {
    pub fn new(config: LookupConfig) -> Self {
        Self {
            config,
            addr: ([127, 0, 0, 1], 3000).into(),
            prometheus: None,
        }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Serve `/metrics` from this recorder
    pub fn prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Validate the config and build all sources
    pub fn build(self) -> Result<LookupServer> {
        let state = create_shared_state(&self.config)?;
        tracing::info!(
            sources = self.config.sources.len(),
            concurrency_limit = self.config.concurrency_limit,
            admission = self.config.admission.enabled,
            "Lookup engine ready"
        );

        Ok(LookupServer {
            state,
            addr: self.addr,
            allowed_origins: self.config.allowed_origins,
            prometheus: self.prometheus,
        })
    }
}
