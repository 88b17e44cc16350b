//! DTOs for the JSON shortening endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    /// Full short URL, newly created or already existing.
    pub result: String,
}
