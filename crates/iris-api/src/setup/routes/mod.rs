//! Route configuration and setup.
//!
//! File routes live under `/files`; health checks in [health](health).

mod health;

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use iris_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let request_timeout_secs = config.request_timeout_secs().max(1);
    tracing::info!(request_timeout_secs, "Request timeout layer enabled");

    let app = Router::new()
        .merge(public_routes())
        .merge(file_routes(config))
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_secs)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins().iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::liveness_check))
        .route("/api/openapi.json", get(openapi_spec))
}

fn file_routes(config: &Config) -> Router<Arc<AppState>> {
    let upload_body_limit = config.max_request_body_bytes();
    tracing::info!(upload_body_limit, "Upload request body limit enabled");

    Router::new()
        .route(
            "/files/upload/{story_id}",
            // The default 2 MB extractor limit stays in force on every other route.
            post(handlers::upload::upload_files)
                .layer::<_, std::convert::Infallible>(RequestBodyLimitLayer::new(upload_body_limit))
                .layer(DefaultBodyLimit::disable()),
        )
        .route("/files/test", get(handlers::storage_probe::test_storage))
        .route(
            "/files/story/{story_id}",
            get(handlers::file_get::list_story_files),
        )
        .route(
            "/files/{id}",
            get(handlers::file_get::get_file)
                .put(handlers::file_update::update_file)
                .delete(handlers::file_delete::delete_file),
        )
}

async fn openapi_spec() -> impl IntoResponse {
    Json(crate::api_doc::get_openapi_spec())
}
