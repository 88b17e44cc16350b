//! Handler for batch shortening.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::json;

use super::invalid_json;
use crate::api::dto::batch::{BatchRequestItem, BatchResponseItem};
use crate::api::middleware::identity::Identity;
use crate::error::AppError;
use crate::state::AppState;

/// Shortens several URLs at once.
///
/// # Endpoint
///
/// `POST /api/shorten/batch`
///
/// # Request Body
///
/// ```json
/// [
///   { "correlation_id": "1", "original_url": "https://one.example.com" },
///   { "correlation_id": "2", "original_url": "https://two.example.com" }
/// ]
/// ```
///
/// # Response
///
/// `201 Created` with one `{correlation_id, short_url}` per item, in request
/// order. Every item gets a new mapping; duplicates are not detected.
///
/// # Errors
///
/// Returns 400 Bad Request for an empty batch or an item with an empty URL.
/// Returns 500 if the backend aborted the batch.
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<Vec<BatchRequestItem>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<BatchResponseItem>>), AppError> {
    let Json(items) = payload.map_err(invalid_json)?;

    if items.is_empty() {
        return Err(AppError::bad_request("Batch must not be empty", json!({})));
    }

    let entries = items
        .into_iter()
        .map(|item| item.into_entry(&identity.user_id))
        .collect();

    let shortened = state.mapping.store_batch(entries).await?;

    Ok((
        StatusCode::CREATED,
        Json(shortened.into_iter().map(BatchResponseItem::from).collect()),
    ))
}
