//! Business logic services for the application layer.

pub mod identity_service;
pub mod mapping_service;

pub use identity_service::IdentityService;
pub use mapping_service::{
    BatchEntry, BatchShortened, Lookup, MappingService, OwnedUrl, StoreOutcome, Stored,
};
