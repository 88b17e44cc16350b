//! URL mapping entity: a short code bound to a long URL and its owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored mapping between a short code and a long URL.
///
/// Mappings are never physically removed. Soft deletion sets `deleted`, after
/// which lookups report the code as gone while the row stays for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMapping {
    pub short_code: String,
    pub long_url: String,
    pub owner_id: String,
    pub deleted: bool,
    /// Insertion order. Relational rows use the serial `id`, the in-memory
    /// store uses the recovery log sequence.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl UrlMapping {
    /// Creates a live (non-deleted) mapping.
    pub fn new(
        short_code: String,
        long_url: String,
        owner_id: String,
        sequence: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            short_code,
            long_url,
            owner_id,
            deleted: false,
            sequence,
            created_at,
        }
    }

    /// Returns true if the mapping is visible to lookups.
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// Input data for creating a new mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMapping {
    pub short_code: String,
    pub long_url: String,
    pub owner_id: String,
}

impl NewMapping {
    pub fn new(
        short_code: impl Into<String>,
        long_url: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            short_code: short_code.into(),
            long_url: long_url.into(),
            owner_id: owner_id.into(),
        }
    }
}

/// One entry of a batch create request, tagged with the caller's correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub correlation_id: String,
    pub mapping: NewMapping,
}

/// Result of a conflict-aware insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// The mapping was stored.
    Inserted,
    /// An active mapping for the same `(long_url, owner_id)` already exists.
    Existing(String),
    /// The requested short code is already in use; nothing was written.
    CodeTaken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_mapping_creation() {
        let now = Utc::now();
        let mapping = UrlMapping::new(
            "abc123".to_string(),
            "https://example.com".to_string(),
            "user-a".to_string(),
            7,
            now,
        );

        assert_eq!(mapping.short_code, "abc123");
        assert_eq!(mapping.long_url, "https://example.com");
        assert_eq!(mapping.owner_id, "user-a");
        assert_eq!(mapping.sequence, 7);
        assert_eq!(mapping.created_at, now);
        assert!(mapping.is_active());
    }

    #[test]
    fn test_deleted_mapping_is_not_active() {
        let mut mapping = UrlMapping::new(
            "abc123".to_string(),
            "https://example.com".to_string(),
            "user-a".to_string(),
            1,
            Utc::now(),
        );
        mapping.deleted = true;

        assert!(!mapping.is_active());
    }

    #[test]
    fn test_new_mapping_from_str() {
        let new_mapping = NewMapping::new("xyz789", "https://rust-lang.org", "user-b");

        assert_eq!(new_mapping.short_code, "xyz789");
        assert_eq!(new_mapping.long_url, "https://rust-lang.org");
        assert_eq!(new_mapping.owner_id, "user-b");
    }
}
