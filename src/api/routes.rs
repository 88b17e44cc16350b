//! API route configuration.
//!
//! Every route here runs behind [`crate::api::middleware::identity`].

use crate::api::handlers::{
    delete_user_urls_handler, list_user_urls_handler, shorten_batch_handler,
    shorten_json_handler, shorten_text_handler,
};
use crate::state::AppState;
use axum::{Router, routing::post};

/// Routes that act on behalf of an owner.
///
/// # Endpoints
///
/// - `POST   /`                   - Shorten a URL sent as plain text
/// - `POST   /api/shorten`        - Shorten a URL sent as JSON
/// - `POST   /api/shorten/batch`  - Shorten several URLs at once
/// - `GET    /api/user/urls`      - List the caller's mappings
/// - `DELETE /api/user/urls`      - Queue deletion of the caller's codes
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(shorten_text_handler))
        .route("/api/shorten", post(shorten_json_handler))
        .route("/api/shorten/batch", post(shorten_batch_handler))
        .route(
            "/api/user/urls",
            axum::routing::get(list_user_urls_handler).delete(delete_user_urls_handler),
        )
}
