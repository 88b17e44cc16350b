//! Core domain entities.
//!
//! - [`UrlMapping`] - A stored short code → long URL mapping
//! - [`NewMapping`] - Input for creating a mapping
//! - [`BatchItem`] - A batch entry tagged with a caller correlation id
//! - [`Insertion`] - Outcome of a conflict-aware insert

pub mod url_mapping;

pub use url_mapping::{BatchItem, Insertion, NewMapping, UrlMapping};
