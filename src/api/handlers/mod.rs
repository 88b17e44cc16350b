//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod batch;
pub mod ping;
pub mod redirect;
pub mod shorten;
pub mod user_urls;

pub use batch::shorten_batch_handler;
pub use ping::ping_handler;
pub use redirect::redirect_handler;
pub use shorten::{shorten_json_handler, shorten_text_handler};
pub use user_urls::{delete_user_urls_handler, list_user_urls_handler};

use axum::extract::rejection::JsonRejection;
use serde_json::json;

use crate::error::AppError;

/// Maps a malformed JSON body to a 400 response.
pub(crate) fn invalid_json(rejection: JsonRejection) -> AppError {
    AppError::bad_request(
        "Invalid JSON body",
        json!({ "reason": rejection.body_text() }),
    )
}
