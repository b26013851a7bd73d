pub mod auth;
pub mod middleware;
pub mod multipart;
pub mod response;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::{generate_report_handler, health_handler, ApiDoc};

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::web::auth::login_handler;
use crate::web::state::AppState;

/// Room for multipart framing on top of the payload ceiling.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Builds the API router: public login and health routes, and the
/// token-guarded report route.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.config.cors_allowed_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .expose_headers([axum::http::header::CONTENT_DISPOSITION]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/admin/login", post(login_handler))
        .route("/api/health", get(health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/admin/generate-report", post(generate_report_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let body_limit = state
        .config
        .upload
        .max_payload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
