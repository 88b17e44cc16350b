//! Domain layer containing business entities and logic.
//!
//! Defines mapping entities, the storage contract and the soft-delete
//! pipeline, independent of any concrete backend or of HTTP.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Storage trait implemented by the infrastructure layer
//! - [`delete_job`] - Delete batches, tickets and summaries
//! - [`delete_worker`] - Asynchronous soft-delete worker pool
//!
//! # Delete Flow
//!
//! 1. The HTTP handler calls [`crate::application::services::MappingService::delete_for_owner`]
//! 2. Codes are split into [`delete_job::DeleteBatch`]es and queued
//! 3. [`delete_worker::DeletePipeline`] workers apply each batch with
//!    [`repositories::UrlRepository::mark_deleted`]
//! 4. Outcomes reach the optional [`delete_job::DeleteTicket`]

pub mod delete_job;
pub mod delete_worker;
pub mod entities;
pub mod repositories;
