//! Repository trait definitions for the domain layer.
//!
//! The [`UrlRepository`] trait is the contract every storage backend fulfils.
//! Implementations live in `crate::infrastructure::persistence`; mock
//! implementations are generated via `mockall` for testing.

pub mod url_repository;

pub use url_repository::{StoreError, UrlRepository};

#[cfg(test)]
pub use url_repository::MockUrlRepository;
