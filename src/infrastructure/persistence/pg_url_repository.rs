//! PostgreSQL implementation of the URL repository.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgPool};

use crate::domain::entities::{BatchItem, Insertion, NewMapping, UrlMapping};
use crate::domain::repositories::{StoreError, UrlRepository};

/// Upper bound for every call into the database, pool acquisition included.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "SELECT id, short_url, long_url, user_id, deleted, created_at FROM urls";

const UPSERT: &str = r#"
    INSERT INTO urls (short_url, long_url, user_id)
    VALUES ($1, $2, $3)
    ON CONFLICT (short_url) DO UPDATE
    SET long_url = EXCLUDED.long_url, user_id = EXCLUDED.user_id
"#;

#[derive(sqlx::FromRow)]
struct UrlRow {
    id: i64,
    short_url: String,
    long_url: String,
    user_id: String,
    deleted: bool,
    created_at: DateTime<Utc>,
}

impl From<UrlRow> for UrlMapping {
    fn from(row: UrlRow) -> Self {
        Self {
            short_code: row.short_url,
            long_url: row.long_url,
            owner_id: row.user_id,
            deleted: row.deleted,
            sequence: row.id as u64,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL repository over the single `urls` table.
///
/// Each call checks a connection out of the pool for its duration and is cut
/// off after [`QUERY_TIMEOUT`].
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn bounded<T, E, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<StoreError>,
    {
        match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(StoreError::Timeout(QUERY_TIMEOUT)),
        }
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn exists(&self, long_url: &str, owner_id: &str) -> Result<bool, StoreError> {
        self.bounded(
            sqlx::query_scalar::<_, bool>(
                r#"
            SELECT EXISTS(
                SELECT 1 FROM urls
                WHERE long_url = $1 AND user_id = $2 AND deleted = FALSE
            )
            "#,
            )
            .bind(long_url)
            .bind(owner_id)
            .fetch_one(self.pool.as_ref()),
        )
        .await
    }

    async fn find_short_code(
        &self,
        long_url: &str,
        owner_id: &str,
    ) -> Result<Option<String>, StoreError> {
        self.bounded(
            sqlx::query_scalar::<_, String>(
                r#"
            SELECT short_url FROM urls
            WHERE long_url = $1 AND user_id = $2 AND deleted = FALSE
            ORDER BY id
            LIMIT 1
            "#,
            )
            .bind(long_url)
            .bind(owner_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await
    }

    async fn insert(&self, mapping: &NewMapping) -> Result<Insertion, StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            // Serializes concurrent creates of the same (owner, url) pair
            // until this transaction ends.
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
                .bind(&mapping.owner_id)
                .bind(&mapping.long_url)
                .execute(&mut *tx)
                .await?;

            let existing = sqlx::query_scalar::<_, String>(
                r#"
                SELECT short_url FROM urls
                WHERE long_url = $1 AND user_id = $2 AND deleted = FALSE
                ORDER BY id
                LIMIT 1
                "#,
            )
            .bind(&mapping.long_url)
            .bind(&mapping.owner_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(code) = existing {
                tx.rollback().await?;
                return Ok::<_, sqlx::Error>(Insertion::Existing(code));
            }

            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM urls WHERE short_url = $1)",
            )
            .bind(&mapping.short_code)
            .fetch_one(&mut *tx)
            .await?;

            if taken {
                tx.rollback().await?;
                return Ok(Insertion::CodeTaken);
            }

            sqlx::query(UPSERT)
                .bind(&mapping.short_code)
                .bind(&mapping.long_url)
                .bind(&mapping.owner_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(Insertion::Inserted)
        })
        .await
    }

    async fn get_mapping(&self, short_code: &str) -> Result<Option<UrlMapping>, StoreError> {
        let query = format!("{SELECT_COLUMNS} WHERE short_url = $1");

        let row = self
            .bounded(
                sqlx::query_as::<_, UrlRow>(&query)
                    .bind(short_code)
                    .fetch_optional(self.pool.as_ref()),
            )
            .await?;

        Ok(row.map(UrlMapping::from))
    }

    async fn taken_codes(&self, short_codes: &[String]) -> Result<HashSet<String>, StoreError> {
        if short_codes.is_empty() {
            return Ok(HashSet::new());
        }

        let taken = self
            .bounded(
                sqlx::query_scalar::<_, String>("SELECT short_url FROM urls WHERE short_url = ANY($1)")
                    .bind(short_codes)
                    .fetch_all(self.pool.as_ref()),
            )
            .await?;

        Ok(taken.into_iter().collect())
    }

    async fn insert_batch(&self, items: &[BatchItem]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }

        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            for item in items {
                sqlx::query(UPSERT)
                    .bind(&item.mapping.short_code)
                    .bind(&item.mapping.long_url)
                    .bind(&item.mapping.owner_id)
                    .execute(&mut *tx)
                    .await?;
            }

            // Dropping `tx` on an early return rolls the whole batch back.
            tx.commit().await?;

            Ok::<_, sqlx::Error>(())
        })
        .await
    }

    async fn mark_deleted(
        &self,
        owner_id: &str,
        short_codes: &[String],
    ) -> Result<u64, StoreError> {
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                UPDATE urls SET deleted = TRUE
                WHERE user_id = $1 AND short_url = ANY($2) AND deleted = FALSE
                "#,
                )
                .bind(owner_id)
                .bind(short_codes)
                .execute(self.pool.as_ref()),
            )
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlMapping>, StoreError> {
        let query = format!("{SELECT_COLUMNS} WHERE user_id = $1 AND deleted = FALSE ORDER BY id");

        let rows = self
            .bounded(
                sqlx::query_as::<_, UrlRow>(&query)
                    .bind(owner_id)
                    .fetch_all(self.pool.as_ref()),
            )
            .await?;

        Ok(rows.into_iter().map(UrlMapping::from).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            conn.ping().await
        })
        .await
    }
}
