//! HTTP server facade with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{extract::Request, http::HeaderValue, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::{Timestamp, Uuid};

use reservation_kernel::{settings::ServerSettings, ModuleRegistry};

pub mod error;
pub mod router;
pub mod shutdown;

pub use error::AppError;
use router::RouterBuilder;

/// Bind to the configured address and serve until `shutdown` resolves
pub async fn start_server(
    title: &str,
    registry: &ModuleRegistry,
    server: &ServerSettings,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    tracing::info!(server = title, "starting HTTP server on {}", server.bind_addr());

    let listener = TcpListener::bind(server.bind_addr())
        .await
        .with_context(|| format!("failed to bind to {}", server.bind_addr()))?;

    let app = build_router(title, registry, server);
    serve(title, listener, app, shutdown).await
}

/// Serve an already-built router on an already-bound listener
pub async fn serve(
    title: &str,
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener
        .local_addr()
        .context("failed to read listener address")?;

    tracing::info!(server = title, "HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!(server = title, "HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes merged
pub fn build_router(title: &str, registry: &ModuleRegistry, server: &ServerSettings) -> Router {
    let mut router_builder = RouterBuilder::new().route("/healthz", get(health_check));

    for module in registry.modules() {
        tracing::info!(module = module.name(), "mounting module routes");
        router_builder = router_builder.merge_module(module.routes());
    }

    router_builder
        .with_openapi(title, registry)
        .with_timeout(server.request_timeout_ms)
        .with_cors()
        .with_tracing()
        .with_request_id()
        .build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}
