//! Application layer services implementing business logic.
//!
//! Services consume the repository trait and give HTTP handlers a
//! backend-agnostic API.
//!
//! # Available Services
//!
//! - [`services::mapping_service::MappingService`] - Mapping creation, lookup, listing and deletion
//! - [`services::identity_service::IdentityService`] - Signed owner identity tokens

pub mod services;
