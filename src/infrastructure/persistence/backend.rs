//! The storage backend selected at startup.

use std::collections::HashSet;

use async_trait::async_trait;

use super::{MemoryStore, PgUrlRepository};
use crate::domain::entities::{BatchItem, Insertion, NewMapping, UrlMapping};
use crate::domain::repositories::{StoreError, UrlRepository};

/// Exactly one storage variant, chosen once per process.
///
/// Business logic only sees [`UrlRepository`]; this enum is the single place
/// where the two variants are told apart.
pub enum Backend {
    Memory(MemoryStore),
    Relational(PgUrlRepository),
}

impl Backend {
    /// Short label for logs and health output.
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Memory(_) => "memory",
            Backend::Relational(_) => "postgres",
        }
    }
}

macro_rules! delegate {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Backend::Memory($store) => $call,
            Backend::Relational($store) => $call,
        }
    };
}

#[async_trait]
impl UrlRepository for Backend {
    async fn exists(&self, long_url: &str, owner_id: &str) -> Result<bool, StoreError> {
        delegate!(self, store => store.exists(long_url, owner_id).await)
    }

    async fn find_short_code(
        &self,
        long_url: &str,
        owner_id: &str,
    ) -> Result<Option<String>, StoreError> {
        delegate!(self, store => store.find_short_code(long_url, owner_id).await)
    }

    async fn insert(&self, mapping: &NewMapping) -> Result<Insertion, StoreError> {
        delegate!(self, store => store.insert(mapping).await)
    }

    async fn get_mapping(&self, short_code: &str) -> Result<Option<UrlMapping>, StoreError> {
        delegate!(self, store => store.get_mapping(short_code).await)
    }

    async fn taken_codes(&self, short_codes: &[String]) -> Result<HashSet<String>, StoreError> {
        delegate!(self, store => store.taken_codes(short_codes).await)
    }

    async fn insert_batch(&self, items: &[BatchItem]) -> Result<(), StoreError> {
        delegate!(self, store => store.insert_batch(items).await)
    }

    async fn mark_deleted(
        &self,
        owner_id: &str,
        short_codes: &[String],
    ) -> Result<u64, StoreError> {
        delegate!(self, store => store.mark_deleted(owner_id, short_codes).await)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlMapping>, StoreError> {
        delegate!(self, store => store.list_by_owner(owner_id).await)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        delegate!(self, store => store.ping().await)
    }
}
