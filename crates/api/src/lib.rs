//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes
//! - The JSON response envelope
//! - Router assembly with CORS, tracing and body limits

pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::get,
};
use picshare_core::post::PostService;
use picshare_shared::{CorsConfig, UploadConfig};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Room for form fields and multipart boundaries on top of the photo itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Post lifecycle service.
    pub posts: Arc<PostService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState, cors: &CorsConfig, upload: &UploadConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes())
        .layer(DefaultBodyLimit::max(body_limit(upload)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
        .with_state(state)
}

async fn root() -> &'static str {
    "Hello from Picshare!"
}

/// Largest accepted request body.
fn body_limit(upload: &UploadConfig) -> usize {
    usize::try_from(upload.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD)
}

/// CORS restricted to the configured origins.
///
/// Requests without an `Origin` header are not affected by CORS at all.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}
