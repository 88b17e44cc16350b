//! Data Transfer Objects for API requests and responses.

pub mod batch;
pub mod shorten;
pub mod user_urls;
