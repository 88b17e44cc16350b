#![allow(dead_code)]

use axum::http::HeaderValue;
use axum_test::{TestResponse, TestServer};
use std::sync::Arc;
use url_mapper::application::services::{IdentityService, MappingService};
use url_mapper::domain::delete_worker::DeletePipelineConfig;
use url_mapper::infrastructure::persistence::{Backend, MemoryStore};
use url_mapper::routes::router;
use url_mapper::state::AppState;

pub const BASE_URL: &str = "http://localhost:8080";
pub const IDENTITY_SECRET: &str = "test-identity-secret";

pub fn create_test_state(backend: Backend) -> AppState {
    let mapping = Arc::new(MappingService::new(
        Arc::new(backend),
        BASE_URL,
        DeletePipelineConfig::default(),
    ));
    let identity = Arc::new(IdentityService::new(IDENTITY_SECRET));

    AppState::new(mapping, identity)
}

/// Full router over an empty in-memory backend.
pub fn memory_server() -> TestServer {
    TestServer::new(router(create_test_state(Backend::Memory(MemoryStore::new())))).unwrap()
}

/// A `Cookie` header value carrying a valid identity for `user_id`.
pub fn identity_cookie(user_id: &str) -> String {
    let token = IdentityService::new(IDENTITY_SECRET).sign(user_id);
    format!("user_id={token}")
}

/// The `name=value` part of the response's `Set-Cookie` header.
pub fn issued_cookie(response: &TestResponse) -> String {
    let value: HeaderValue = response.header("set-cookie");
    value
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

/// Short code at the end of a short URL.
pub fn code_of(short_url: &str) -> &str {
    short_url.rsplit('/').next().unwrap()
}
