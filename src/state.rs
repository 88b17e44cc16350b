//! Shared application state.

use std::sync::Arc;

use crate::application::services::{IdentityService, MappingService};
use crate::infrastructure::persistence::Backend;

/// State injected into every handler.
///
/// Cheap to clone; every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub mapping: Arc<MappingService<Backend>>,
    pub identity: Arc<IdentityService>,
}

impl AppState {
    pub fn new(mapping: Arc<MappingService<Backend>>, identity: Arc<IdentityService>) -> Self {
        Self { mapping, identity }
    }
}
