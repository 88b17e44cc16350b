//! DTOs for the owner listing endpoint.

use serde::{Deserialize, Serialize};

use crate::application::services::OwnedUrl;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

impl From<OwnedUrl> for UserUrl {
    fn from(url: OwnedUrl) -> Self {
        Self {
            short_url: url.short_url,
            original_url: url.long_url,
        }
    }
}
