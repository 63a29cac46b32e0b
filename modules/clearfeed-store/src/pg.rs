//! Postgres implementation of the storage boundary.
//!
//! Uniqueness is enforced by two partial unique indexes (content hash,
//! canonical URL); `claim_canonical` translates a violation into a typed
//! `ClaimOutcome::Conflict` using the violated constraint's name.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use clearfeed_common::{CanonicalRecord, GuideRecord, RawItem, RawPayload};

use crate::store::{ClaimOutcome, ConflictKind, GuideStore, ItemStore, StoreError};

const ITEM_COLUMNS: &str = "id, source_id, title, url, summary, tags, guid, published_at, \
                            payload, canonical_url, content_hash, published_utc, processed, \
                            is_duplicate, duplicate_of, skip_reason, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_item(row: &PgRow) -> Result<RawItem, sqlx::Error> {
    Ok(RawItem {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        summary: row.try_get("summary")?,
        tags: row.try_get("tags")?,
        guid: row.try_get("guid")?,
        published_at: row.try_get("published_at")?,
        payload: RawPayload::from_value(row.try_get::<serde_json::Value, _>("payload")?),
        canonical_url: row.try_get("canonical_url")?,
        content_hash: row.try_get("content_hash")?,
        published_utc: row.try_get("published_utc")?,
        processed: row.try_get("processed")?,
        is_duplicate: row.try_get("is_duplicate")?,
        duplicate_of: row.try_get("duplicate_of")?,
        skip_reason: row.try_get("skip_reason")?,
        created_at: row.try_get("created_at")?,
    })
}

fn conflict_kind(constraint: Option<&str>) -> ConflictKind {
    match constraint {
        Some("idx_raw_items_content_hash") => ConflictKind::Fingerprint,
        Some("idx_raw_items_canonical_url") => ConflictKind::CanonicalUrl,
        _ => ConflictKind::Unknown,
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<RawItem>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM raw_items \
             WHERE processed = FALSE \
             ORDER BY created_at ASC, id ASC \
             LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| row_to_item(r).map_err(StoreError::from))
            .collect()
    }

    async fn claim_canonical(
        &self,
        id: Uuid,
        record: &CanonicalRecord,
        fingerprint: &str,
    ) -> Result<ClaimOutcome, StoreError> {
        let result = sqlx::query(
            "UPDATE raw_items \
             SET title = $2, \
                 canonical_url = $3, \
                 content_hash = $4, \
                 source_id = $5, \
                 tags = $6, \
                 published_utc = $7, \
                 processed = TRUE, \
                 is_duplicate = FALSE, \
                 duplicate_of = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&record.title)
        .bind(&record.canonical_url)
        .bind(fingerprint)
        .bind(&record.source.source_id)
        .bind(&record.tags)
        .bind(record.published_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(ClaimOutcome::Claimed),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(ClaimOutcome::Conflict(conflict_kind(db.constraint())))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<RawItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM raw_items WHERE content_hash = $1"
        ))
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_item).transpose().map_err(StoreError::from)
    }

    async fn find_by_canonical_url(
        &self,
        canonical_url: &str,
    ) -> Result<Option<RawItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM raw_items WHERE canonical_url = $1"
        ))
        .bind(canonical_url)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_item).transpose().map_err(StoreError::from)
    }

    async fn mark_duplicate(
        &self,
        id: Uuid,
        record: &CanonicalRecord,
        canonical_id: Uuid,
    ) -> Result<(), StoreError> {
        // Display fields only; the unique keys stay with the canonical record.
        sqlx::query(
            "UPDATE raw_items \
             SET title = $2, \
                 source_id = $3, \
                 tags = $4, \
                 published_utc = $5, \
                 processed = TRUE, \
                 is_duplicate = TRUE, \
                 duplicate_of = $6 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&record.title)
        .bind(&record.source.source_id)
        .bind(&record.tags)
        .bind(record.published_at)
        .bind(canonical_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_skipped(&self, id: Uuid, reason: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE raw_items \
             SET processed = TRUE, \
                 skip_reason = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl GuideStore for PgStore {
    async fn list_guides(&self) -> Result<Vec<GuideRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, slug, summary, steps, examples, status \
             FROM guides ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(GuideRecord {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    slug: row.try_get("slug")?,
                    summary: row.try_get("summary")?,
                    steps: row.try_get("steps")?,
                    examples: row.try_get("examples")?,
                    status: row.try_get("status")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StoreError::from)
    }
}
