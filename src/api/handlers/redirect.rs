//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use serde_json::json;

use crate::application::services::Lookup;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Errors
///
/// Returns 404 Not Found if the code was never issued.
/// Returns 410 Gone if the mapping was deleted by its owner.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    match state.mapping.retrieve_url(&code).await? {
        Lookup::Found { long_url, .. } => Ok(Redirect::temporary(&long_url)),
        Lookup::NotFound => Err(AppError::not_found(
            "Short URL not found",
            json!({ "code": code }),
        )),
        Lookup::Gone => Err(AppError::gone(
            "Short URL has been deleted",
            json!({ "code": code }),
        )),
    }
}
