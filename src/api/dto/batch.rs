//! DTOs for batch shortening.

use serde::{Deserialize, Serialize};

use crate::application::services::{BatchEntry, BatchShortened};

/// One URL of a batch request. `correlation_id` is echoed back untouched.
#[derive(Debug, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

impl BatchRequestItem {
    pub fn into_entry(self, owner_id: &str) -> BatchEntry {
        BatchEntry {
            correlation_id: self.correlation_id,
            long_url: self.original_url,
            owner_id: owner_id.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}

impl From<BatchShortened> for BatchResponseItem {
    fn from(item: BatchShortened) -> Self {
        Self {
            correlation_id: item.correlation_id,
            short_url: item.short_url,
        }
    }
}
