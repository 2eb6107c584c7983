//! PostgreSQL implementation of link repository.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::domain::entities::{CreatedLink, Link, Resolution};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::code_generator::{MAX_ID_ATTEMPTS, generate_short_id, id_space_exhausted};
use crate::utils::db_error::is_short_id_collision;
use crate::utils::url_validator::validate_original_url;

#[derive(Debug, FromRow)]
struct LinkRow {
    id: i64,
    short_id: String,
    original_url: String,
    user_id: String,
    is_deleted: bool,
    created_at: DateTime<Utc>,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link::new(
            r.id,
            r.short_id,
            r.original_url,
            r.user_id,
            r.is_deleted,
            r.created_at,
        )
    }
}

/// Live and deleted link totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCounts {
    pub live: i64,
    pub deleted: i64,
}

/// PostgreSQL repository for link storage and retrieval.
///
/// Multi-statement operations run inside a transaction that rolls back when
/// dropped, so a cancelled request leaves no partial state.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Opens a pool to `dsn` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] if the database cannot be reached and
    /// [`AppError::Internal`] if migrations fail.
    pub async fn connect(
        dsn: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(dsn)
            .await?;
        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                AppError::internal(
                    "Failed to apply migrations",
                    json!({ "reason": e.to_string() }),
                )
            })?;

        Ok(Self::new(Arc::new(pool)))
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }

    pub async fn counts(&self) -> Result<LinkCounts, AppError> {
        let (live, deleted): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE NOT is_deleted),
                COUNT(*) FILTER (WHERE is_deleted)
            FROM urls
            "#,
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(LinkCounts { live, deleted })
    }

    /// One attempt at a batch insert. `Ok(None)` means a generated short ID
    /// collided and the transaction was rolled back.
    async fn try_create_batch(
        &self,
        owner_id: &str,
        urls: &[String],
    ) -> Result<Option<HashMap<String, String>>, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<(String, String)> = sqlx::query_as(
            "SELECT original_url, short_id FROM urls WHERE original_url = ANY($1)",
        )
        .bind(urls)
        .fetch_all(&mut *tx)
        .await?;

        let mut result: HashMap<String, String> = existing.into_iter().collect();
        let missing: Vec<&String> = urls.iter().filter(|u| !result.contains_key(*u)).collect();

        if !missing.is_empty() {
            let mut pending = Vec::with_capacity(missing.len());
            for url in missing {
                pending.push((url.clone(), generate_short_id()?));
            }

            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO urls (short_id, original_url, user_id) ");
            builder.push_values(&pending, |mut row, (url, short_id)| {
                row.push_bind(short_id).push_bind(url).push_bind(owner_id);
            });
            builder.push(" ON CONFLICT (original_url) DO NOTHING RETURNING original_url, short_id");

            let inserted: Vec<(String, String)> =
                match builder.build_query_as().fetch_all(&mut *tx).await {
                    Ok(rows) => rows,
                    Err(e) if is_short_id_collision(&e) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
            result.extend(inserted);

            // Rows inserted concurrently by another request since the first
            // SELECT.
            if result.len() < urls.len() {
                let raced: Vec<String> = urls
                    .iter()
                    .filter(|u| !result.contains_key(*u))
                    .cloned()
                    .collect();
                let rows: Vec<(String, String)> = sqlx::query_as(
                    "SELECT original_url, short_id FROM urls WHERE original_url = ANY($1)",
                )
                .bind(&raced)
                .fetch_all(&mut *tx)
                .await?;
                result.extend(rows);
            }
        }

        tx.commit().await?;
        Ok(Some(result))
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, owner_id: &str, original_url: &str) -> Result<CreatedLink, AppError> {
        validate_original_url(original_url)?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let short_id = generate_short_id()?;
            let mut tx = self.pool.begin().await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO urls (short_id, original_url, user_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (original_url) DO NOTHING
                "#,
            )
            .bind(&short_id)
            .bind(original_url)
            .bind(owner_id)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(done) if done.rows_affected() > 0 => {
                    tx.commit().await?;
                    return Ok(CreatedLink::created(short_id));
                }
                Ok(_) => {
                    let existing: String =
                        sqlx::query_scalar("SELECT short_id FROM urls WHERE original_url = $1")
                            .bind(original_url)
                            .fetch_one(&mut *tx)
                            .await?;
                    tx.commit().await?;
                    return Ok(CreatedLink::existing(existing));
                }
                Err(e) if is_short_id_collision(&e) => {
                    tracing::debug!(short_id = %short_id, "Short ID collision, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(id_space_exhausted())
    }

    async fn create_batch(
        &self,
        owner_id: &str,
        original_urls: &[String],
    ) -> Result<HashMap<String, String>, AppError> {
        for url in original_urls {
            validate_original_url(url)?;
        }

        let mut urls: Vec<String> = Vec::with_capacity(original_urls.len());
        for url in original_urls {
            if !urls.contains(url) {
                urls.push(url.clone());
            }
        }
        if urls.is_empty() {
            return Ok(HashMap::new());
        }

        for _ in 0..MAX_ID_ATTEMPTS {
            if let Some(result) = self.try_create_batch(owner_id, &urls).await? {
                return Ok(result);
            }
            tracing::debug!(count = urls.len(), "Short ID collision in batch, retrying");
        }

        Err(id_space_exhausted())
    }

    async fn resolve(&self, short_id: &str) -> Result<Resolution, AppError> {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT original_url, is_deleted FROM urls WHERE short_id = $1")
                .bind(short_id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(match row {
            None => Resolution::NotFound,
            Some((_, true)) => Resolution::Deleted,
            Some((url, false)) => Resolution::Live(url),
        })
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Link>, AppError> {
        if owner_id.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, short_id, original_url, user_id, is_deleted, created_at
            FROM urls
            WHERE user_id = $1 AND NOT is_deleted
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn mark_deleted(&self, owner_id: &str, short_ids: &[String]) -> Result<u64, AppError> {
        if owner_id.is_empty() || short_ids.is_empty() {
            return Ok(0);
        }

        let done = sqlx::query(
            r#"
            UPDATE urls
            SET is_deleted = TRUE
            WHERE user_id = $1 AND short_id = ANY($2) AND NOT is_deleted
            "#,
        )
        .bind(owner_id)
        .bind(short_ids)
        .execute(self.pool.as_ref())
        .await?;

        Ok(done.rows_affected())
    }

    async fn find_by_short_ids(&self, short_ids: &[String]) -> Result<Vec<Link>, AppError> {
        if short_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, short_id, original_url, user_id, is_deleted, created_at
            FROM urls
            WHERE short_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(short_ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Database ping failed");
                AppError::unavailable("Database unavailable", json!({}))
            })?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
