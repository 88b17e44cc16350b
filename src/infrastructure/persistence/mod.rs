//! Storage backend implementations.
//!
//! # Backends
//!
//! - [`MemoryStore`] - In-process maps, replayed from a [`RecoveryLog`]
//! - [`PgUrlRepository`] - PostgreSQL `urls` table via SQLx
//! - [`Backend`] - Sum type over the two, selected once at startup

pub mod backend;
pub mod memory_store;
pub mod pg_url_repository;
pub mod recovery_log;

pub use backend::Backend;
pub use memory_store::{MemorySnapshot, MemoryStore};
pub use pg_url_repository::PgUrlRepository;
pub use recovery_log::{JournalFile, LogEvent, RecoveryLog};
