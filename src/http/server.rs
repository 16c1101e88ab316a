//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap a service's routes with the shared middleware stack
//! - Bind the router to a listener
//! - Stop accepting and drain on shutdown
//!
//! # Design Decisions
//! - One server type for all four services; only the routes differ
//! - No request timeout layer: calls between services are never cancelled

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::http::request::with_request_id;
use crate::observability::metrics;

/// HTTP server for one service.
pub struct ServiceServer {
    service: &'static str,
    router: Router,
}

impl ServiceServer {
    pub fn new(service: &'static str, routes: Router) -> Self {
        let routes =
            routes.route_layer(middleware::from_fn_with_state(service, metrics::track_requests));
        Self {
            service,
            router: with_request_id(routes),
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// The fully layered router, for in-process tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(service = self.service, address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!(service = self.service, "HTTP server stopped");
        Ok(())
    }
}
