//! Handler for the backend liveness check.

use axum::extract::State;

use crate::error::AppError;
use crate::state::AppState;

/// Checks that the storage backend is reachable.
///
/// # Endpoint
///
/// `GET /ping`
///
/// Returns `200 OK` with body `OK`, or `500` if the backend does not answer.
pub async fn ping_handler(State(state): State<AppState>) -> Result<&'static str, AppError> {
    state.mapping.ping().await?;
    Ok("OK")
}
