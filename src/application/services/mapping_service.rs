//! URL mapping engine: create, resolve, batch-create, list and soft-delete.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info};

use crate::domain::delete_job::DeleteTicket;
use crate::domain::delete_worker::{DeletePipeline, DeletePipelineConfig};
use crate::domain::entities::{BatchItem, Insertion, NewMapping};
use crate::domain::repositories::{StoreError, UrlRepository};
use crate::error::AppError;
use crate::utils::code_generator::{SHORT_CODE_LENGTH, generate_code, is_short_code};

/// Attempts at finding an unused short code before giving up.
const MAX_ATTEMPTS: usize = 10;

/// Whether [`MappingService::store_url`] created a mapping or found one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Created,
    /// The owner already has an active mapping for this URL; the existing
    /// short URL is returned.
    Conflict,
}

/// Result of [`MappingService::store_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored {
    pub short_code: String,
    pub short_url: String,
    pub outcome: StoreOutcome,
}

impl Stored {
    pub fn created(&self) -> bool {
        self.outcome == StoreOutcome::Created
    }
}

/// Result of [`MappingService::retrieve_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found { long_url: String, owner_id: String },
    /// The code has never been issued.
    NotFound,
    /// The code exists but was soft-deleted.
    Gone,
}

/// One entry of a batch create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub correlation_id: String,
    pub long_url: String,
    pub owner_id: String,
}

/// One entry of a batch create response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchShortened {
    pub correlation_id: String,
    pub short_url: String,
}

/// A mapping as shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedUrl {
    pub short_url: String,
    pub long_url: String,
}

/// The mapping engine.
///
/// Owns every mutation of mapping state and behaves the same whichever
/// backend `R` is. Soft deletes are handed to a [`DeletePipeline`] owned by
/// the service.
pub struct MappingService<R: UrlRepository> {
    repository: Arc<R>,
    deletes: DeletePipeline,
    base_url: String,
}

impl<R: UrlRepository + 'static> MappingService<R> {
    /// Creates the service and starts its delete workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        repository: Arc<R>,
        base_url: impl Into<String>,
        delete_config: DeletePipelineConfig,
    ) -> Self {
        let deletes = DeletePipeline::spawn(repository.clone(), delete_config);

        Self {
            repository,
            deletes,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Builds the public short URL for a code.
    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/{}", self.base_url, short_code)
    }

    /// Shortens `long_url` for `owner_id`.
    ///
    /// Returns the existing short URL with [`StoreOutcome::Conflict`] when
    /// the owner already has an active mapping for the same URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `long_url` is empty.
    /// Returns [`AppError::Internal`] on storage failures or when no unused
    /// code is found.
    pub async fn store_url(&self, long_url: &str, owner_id: &str) -> Result<Stored, AppError> {
        if long_url.is_empty() {
            return Err(AppError::bad_request("URL must not be empty", json!({})));
        }

        if let Some(code) = self
            .repository
            .find_short_code(long_url, owner_id)
            .await
            .map_err(|e| store_failure("find_short_code", e))?
        {
            return Ok(self.stored(code, StoreOutcome::Conflict));
        }

        for _ in 0..MAX_ATTEMPTS {
            let mapping = NewMapping::new(generate_code(SHORT_CODE_LENGTH), long_url, owner_id);

            match self
                .repository
                .insert(&mapping)
                .await
                .map_err(|e| store_failure("insert", e))?
            {
                Insertion::Inserted => {
                    debug!(code = %mapping.short_code, owner_id, "Mapping created");
                    return Ok(self.stored(mapping.short_code, StoreOutcome::Created));
                }
                Insertion::Existing(code) => {
                    return Ok(self.stored(code, StoreOutcome::Conflict));
                }
                Insertion::CodeTaken => continue,
            }
        }

        Err(too_many_collisions())
    }

    /// Resolves a short code.
    ///
    /// Codes that do not have the generated shape are reported as
    /// [`Lookup::NotFound`] without a backend round trip.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage failures.
    pub async fn retrieve_url(&self, short_code: &str) -> Result<Lookup, AppError> {
        if !is_short_code(short_code) {
            return Ok(Lookup::NotFound);
        }

        let mapping = self
            .repository
            .get_mapping(short_code)
            .await
            .map_err(|e| store_failure("get_mapping", e))?;

        Ok(match mapping {
            None => Lookup::NotFound,
            Some(m) if m.deleted => Lookup::Gone,
            Some(m) => Lookup::Found {
                long_url: m.long_url,
                owner_id: m.owner_id,
            },
        })
    }

    /// Creates one mapping per entry, without duplicate detection.
    ///
    /// Results are returned in request order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if any entry has an empty URL; nothing
    /// is stored in that case.
    /// Returns [`AppError::Internal`] on storage failures while drawing codes
    /// or when no unused codes are found.
    /// Returns [`AppError::BatchAborted`] if the backend rejects the batch.
    pub async fn store_batch(
        &self,
        entries: Vec<BatchEntry>,
    ) -> Result<Vec<BatchShortened>, AppError> {
        if let Some(entry) = entries.iter().find(|e| e.long_url.is_empty()) {
            return Err(AppError::bad_request(
                "URL must not be empty",
                json!({ "correlation_id": entry.correlation_id }),
            ));
        }

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let codes = self.unused_codes(entries.len()).await?;

        let items: Vec<BatchItem> = entries
            .into_iter()
            .zip(codes)
            .map(|(entry, code)| BatchItem {
                correlation_id: entry.correlation_id,
                mapping: NewMapping::new(code, entry.long_url, entry.owner_id),
            })
            .collect();

        self.repository.insert_batch(&items).await.map_err(|e| {
            error!(items = items.len(), "Batch insert failed: {}", e);
            AppError::batch_aborted(
                "Batch insert aborted",
                json!({ "reason": e.to_string(), "items": items.len() }),
            )
        })?;

        info!(items = items.len(), "Batch stored");

        Ok(items
            .into_iter()
            .map(|item| BatchShortened {
                short_url: self.short_url(&item.mapping.short_code),
                correlation_id: item.correlation_id,
            })
            .collect())
    }

    /// Lists the owner's active mappings. Empty when there are none.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage failures.
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>, AppError> {
        let mappings = self
            .repository
            .list_by_owner(owner_id)
            .await
            .map_err(|e| store_failure("list_by_owner", e))?;

        Ok(mappings
            .into_iter()
            .map(|m| OwnedUrl {
                short_url: self.short_url(&m.short_code),
                long_url: m.long_url,
            })
            .collect())
    }

    /// Queues a soft delete of the owner's codes and returns at once.
    ///
    /// Only codes owned by `owner_id` are affected. Per-code results are not
    /// reported; the ticket may be dropped.
    pub fn delete_for_owner(&self, owner_id: &str, short_codes: Vec<String>) -> DeleteTicket {
        self.deletes.submit(owner_id, short_codes)
    }

    /// Backend liveness check.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the backend is unreachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.repository
            .ping()
            .await
            .map_err(|e| store_failure("ping", e))
    }

    /// Returns true once the delete pipeline stopped accepting work.
    pub fn deletes_closed(&self) -> bool {
        self.deletes.is_closed()
    }

    /// Stops accepting deletes and waits for queued ones to be applied.
    pub async fn shutdown(&self) {
        self.deletes.shutdown().await;
    }

    fn stored(&self, short_code: String, outcome: StoreOutcome) -> Stored {
        Stored {
            short_url: self.short_url(&short_code),
            short_code,
            outcome,
        }
    }

    /// Draws `count` distinct codes that are unused in the backend.
    ///
    /// Each round checks every outstanding candidate with one
    /// [`UrlRepository::taken_codes`] call and redraws only the rejected ones.
    async fn unused_codes(&self, count: usize) -> Result<Vec<String>, AppError> {
        let mut codes: Vec<Option<String>> = vec![None; count];
        let mut drawn = HashSet::with_capacity(count);

        for _ in 0..MAX_ATTEMPTS {
            let candidates: Vec<(usize, String)> = codes
                .iter()
                .enumerate()
                .filter(|(_, code)| code.is_none())
                .filter_map(|(slot, _)| {
                    let code = generate_code(SHORT_CODE_LENGTH);
                    drawn.insert(code.clone()).then_some((slot, code))
                })
                .collect();

            if !candidates.is_empty() {
                let lookup: Vec<String> = candidates.iter().map(|(_, code)| code.clone()).collect();
                let taken = self
                    .repository
                    .taken_codes(&lookup)
                    .await
                    .map_err(|e| store_failure("taken_codes", e))?;

                for (slot, code) in candidates {
                    if !taken.contains(&code) {
                        codes[slot] = Some(code);
                    }
                }
            }

            if codes.iter().all(Option::is_some) {
                return Ok(codes.into_iter().flatten().collect());
            }
        }

        Err(too_many_collisions())
    }
}

fn store_failure(operation: &'static str, e: StoreError) -> AppError {
    error!(operation, "Storage call failed: {}", e);
    AppError::from(e)
}

fn too_many_collisions() -> AppError {
    AppError::internal(
        "Failed to generate unique code",
        json!({ "reason": "Too many collisions" }),
    )
}
