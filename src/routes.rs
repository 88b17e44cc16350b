//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{code}` - Short link redirect (public)
//! - `GET  /ping`   - Backend liveness (public)
//! - everything in [`api::routes::owner_routes`] - behind the identity cookie
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Gzip** - Request body decompression and response compression
//! - **Identity** - Signed `user_id` cookie for owner routes
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{ping_handler, redirect_handler};
use crate::api::middleware::{identity, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the router with every route and middleware except path
/// normalization.
pub fn router(state: AppState) -> Router {
    let owner_router = api::routes::owner_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        identity::layer,
    ));

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/{code}", get(redirect_handler))
        .merge(owner_router)
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(tracing::layer())
}

/// Constructs the application service: [`router`] with trailing slashes
/// trimmed before routing.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}
