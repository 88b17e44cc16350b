//! Handlers for the caller's own mappings.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use super::invalid_json;
use crate::api::dto::user_urls::UserUrl;
use crate::api::middleware::identity::Identity;
use crate::error::AppError;
use crate::state::AppState;

/// Lists the caller's active mappings.
///
/// # Endpoint
///
/// `GET /api/user/urls`
///
/// # Response
///
/// - **200 OK**: `[{"short_url", "original_url"}, ...]`
/// - **204 No Content**: the caller has no mappings
///
/// # Errors
///
/// Returns 401 Unauthorized if the request carried no valid identity cookie.
pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, AppError> {
    if identity.fresh {
        return Err(AppError::unauthorized(
            "Unauthorized",
            json!({ "reason": "Identity cookie is missing or invalid" }),
        ));
    }

    let urls = state.mapping.list_for_owner(&identity.user_id).await?;

    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<UserUrl> = urls.into_iter().map(UserUrl::from).collect();
    Ok(Json(body).into_response())
}

/// Queues deletion of the caller's short codes.
///
/// # Endpoint
///
/// `DELETE /api/user/urls`
///
/// # Request Body
///
/// ```json
/// ["aB3xY9", "Qw12Er"]
/// ```
///
/// Returns `202 Accepted` before anything is deleted. Codes owned by someone
/// else are ignored.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(codes) = payload.map_err(invalid_json)?;

    if identity.fresh {
        debug!("Delete from a new identity, nothing to delete");
        return Ok(StatusCode::ACCEPTED);
    }

    let ticket = state.mapping.delete_for_owner(&identity.user_id, codes);
    debug!(batches = ticket.batches(), "Delete queued");

    Ok(StatusCode::ACCEPTED)
}
