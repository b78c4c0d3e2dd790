use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use banlist_core::{BannedUsersRegistry, ModuloSampler};
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BannedUsersRegistry>,
    /// Decides which lookups get logged
    pub lookup_sampler: Arc<ModuloSampler>,
}

impl AppState {
    pub fn new(registry: Arc<BannedUsersRegistry>, lookup_log_modulo: u64) -> Self {
        Self {
            registry,
            lookup_sampler: Arc::new(ModuloSampler::new(lookup_log_modulo)),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/status", get(handlers::status))
        .route("/metrics", get(handlers::render_metrics))
        .route("/banned/{login}", get(handlers::banned))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                tracing::debug_span!(
                    "http.request",
                    http.method = %req.method(),
                    http.target = %req.uri().path(),
                )
            }),
        )
        .with_state(state)
}

pub struct BanlistServer {
    addr: SocketAddr,
    app: Router,
}

impl BanlistServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            app: build_app(state),
        }
    }

    /// Serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
