//! REST API server module
//!
//! Exposes job submission and progress polling over HTTP, plus system
//! endpoints (health, capabilities, events, OpenAPI).

use crate::{Config, Coordinator, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /download` - Submit a download job (`{url, folder, mode}` -> `201 {id}`)
/// - `GET /progress/:id` - Poll `{status, progress}` (unknown ids -> `Unknown ID`)
/// - `GET /jobs` - List all tracked jobs
/// - `GET /jobs/:id` - Get a single job
/// - `DELETE /jobs/:id` - Cancel a running job
/// - `GET /info?url=` - Look up media metadata without downloading
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /capabilities` - Engine capabilities
/// - `GET /config` - Effective configuration
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
/// - `POST /shutdown` - Graceful shutdown and process exit (if `shutdown_endpoint` is enabled)
pub fn create_router(coordinator: Arc<Coordinator>, config: Arc<Config>) -> Router {
    let state = AppState::new(coordinator, config.clone());

    let router = Router::new()
        // Jobs
        .route("/download", post(routes::submit_download))
        .route("/progress/:id", get(routes::get_progress))
        .route("/jobs", get(routes::list_jobs))
        .route("/jobs/:id", get(routes::get_job).delete(routes::cancel_job))
        .route("/info", get(routes::probe_media))
        // System
        .route("/health", get(routes::health_check))
        .route("/capabilities", get(routes::get_capabilities))
        .route("/config", get(routes::get_config))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Stops the whole process, so only mounted when explicitly enabled
    let router = if config.server.api.shutdown_endpoint {
        router.route("/shutdown", post(routes::shutdown))
    } else {
        router
    };

    // Swagger UI serves its own copy of the spec (merged before applying state)
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let router = router.with_state(state).layer(trace_layer);

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops or fails.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, Coordinator};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let coordinator = Arc::new(Coordinator::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// media_dl::api::start_api_server(coordinator, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(coordinator: Arc<Coordinator>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(coordinator, config);

    let listener = TcpListener::bind(bind_address).await.map_err(|e| {
        tracing::error!(address = %bind_address, error = %e, "Failed to bind API server");
        crate::error::Error::Io(e)
    })?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
