//! HTTP listener serving the health gauges for scraping

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::metrics::MetricsRegistry;

/// Create the router
pub fn router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/", get(metrics))
        .route("/metrics", get(metrics))
        .with_state(registry)
}

async fn metrics(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    match registry.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Bound scrape listener
pub struct MetricsServer {
    listener: TcpListener,
}

impl MetricsServer {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the token is cancelled
    pub async fn serve(
        self,
        registry: Arc<MetricsRegistry>,
        cancel: CancellationToken,
    ) -> io::Result<()> {
        if let Ok(addr) = self.local_addr() {
            tracing::info!(%addr, "metrics server listening");
        }

        axum::serve(self.listener, router(registry))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
    }
}
