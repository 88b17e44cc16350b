//! Repository trait for URL mapping storage.

use std::collections::HashSet;
use std::time::Duration;

use crate::domain::entities::{BatchItem, Insertion, NewMapping, UrlMapping};
use async_trait::async_trait;

/// Failures raised by a storage backend.
///
/// A missing row is not an error: lookups return `Ok(None)` instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    #[error("recovery log error: {0}")]
    Journal(#[from] std::io::Error),

    #[error("failed to encode recovery log event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

/// Storage capability set shared by every backend.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryStore`] - In-process maps with a recovery log
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL `urls` table
/// - [`crate::infrastructure::persistence::Backend`] - The variant selected at startup
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Returns true if an active mapping exists for `(long_url, owner_id)`.
    async fn exists(&self, long_url: &str, owner_id: &str) -> Result<bool, StoreError>;

    /// Finds the short code of the active mapping for `(long_url, owner_id)`.
    async fn find_short_code(
        &self,
        long_url: &str,
        owner_id: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Stores a mapping unless an active one already exists for the same
    /// `(long_url, owner_id)`.
    ///
    /// The duplicate check and the write happen atomically. A short code
    /// already in use, deleted or not, yields [`Insertion::CodeTaken`] and
    /// nothing is written.
    async fn insert(&self, mapping: &NewMapping) -> Result<Insertion, StoreError>;

    /// Loads a mapping by short code, deleted or not.
    async fn get_mapping(&self, short_code: &str) -> Result<Option<UrlMapping>, StoreError>;

    /// Returns the subset of `short_codes` already in use, deleted or not.
    async fn taken_codes(&self, short_codes: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Stores many mappings without duplicate detection.
    ///
    /// All-or-nothing for the relational backend, best-effort per item for the
    /// memory backend.
    async fn insert_batch(&self, items: &[BatchItem]) -> Result<(), StoreError>;

    /// Flags the owner's mappings among `short_codes` as deleted.
    ///
    /// Returns the number of rows that changed.
    async fn mark_deleted(&self, owner_id: &str, short_codes: &[String])
    -> Result<u64, StoreError>;

    /// Lists the owner's active mappings in insertion order.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlMapping>, StoreError>;

    /// Liveness check.
    async fn ping(&self) -> Result<(), StoreError>;
}
