use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, rate_limit::RateLimiter};
use crate::config::ServerConfig;
use crate::orchestrator::Orchestrator;

const MAX_BODY_BYTES: usize = 16 * 1024;

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{origin}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

/// Full application router with rate limiting, CORS and request tracing.
pub fn app(orchestrator: Arc<Orchestrator>, server: &ServerConfig) -> Result<Router> {
    let limiter = Arc::new(RateLimiter::new(
        server.rate_limit_requests,
        server.rate_limit_window(),
    ));

    Ok(Router::new()
        .route("/health", get(api::health))
        .nest("/api", api::router(orchestrator))
        .layer(middleware::from_fn_with_state(limiter, api::rate_limit::enforce))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.allowed_origins)?))
}

pub async fn run(orchestrator: Arc<Orchestrator>, server: &ServerConfig) -> Result<()> {
    let app = app(orchestrator, server)?;

    let addr = format!("{}:{}", server.bind_address, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server terminated unexpectedly")?;

    tracing::info!("Web server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
