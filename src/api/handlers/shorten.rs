//! Handlers for single URL shortening.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::invalid_json;
use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::api::middleware::identity::Identity;
use crate::application::services::Stored;
use crate::error::AppError;
use crate::state::AppState;

fn status_for(stored: &Stored) -> StatusCode {
    if stored.created() {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    }
}

/// Shortens a URL sent as the raw request body.
///
/// # Endpoint
///
/// `POST /`
///
/// # Response
///
/// - **201 Created**: body is the new short URL
/// - **409 Conflict**: the caller already shortened this URL; body is the
///   existing short URL
///
/// # Errors
///
/// Returns 400 Bad Request if the body is empty.
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: String,
) -> Result<Response, AppError> {
    let stored = state.mapping.store_url(&body, &identity.user_id).await?;

    Ok((status_for(&stored), stored.short_url).into_response())
}

/// Shortens a URL sent as JSON.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com" }
/// ```
///
/// # Response
///
/// ```json
/// { "result": "http://localhost:8080/aB3xY9" }
/// ```
///
/// Status is 201 for a new mapping and 409 when it already existed.
pub async fn shorten_json_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(invalid_json)?;

    let stored = state
        .mapping
        .store_url(&request.url, &identity.user_id)
        .await?;

    Ok((
        status_for(&stored),
        Json(ShortenResponse {
            result: stored.short_url,
        }),
    )
        .into_response())
}
