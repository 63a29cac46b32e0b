//! Idempotent schema migrations: tables, unique keys, fetch index.

use sqlx::PgPool;
use tracing::info;

use crate::store::StoreError;

pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS raw_items (
            id UUID PRIMARY KEY,
            source_id TEXT,
            title TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            tags TEXT[] NOT NULL DEFAULT '{}',
            guid TEXT,
            published_at TEXT,
            payload JSONB NOT NULL DEFAULT '{}'::jsonb,
            canonical_url TEXT,
            content_hash TEXT,
            published_utc TIMESTAMPTZ,
            processed BOOLEAN NOT NULL DEFAULT FALSE,
            is_duplicate BOOLEAN NOT NULL DEFAULT FALSE,
            duplicate_of UUID,
            skip_reason TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        // The two unique keys are the concurrency arbiter for dedup.
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_raw_items_content_hash
            ON raw_items (content_hash) WHERE content_hash IS NOT NULL",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_raw_items_canonical_url
            ON raw_items (canonical_url) WHERE canonical_url IS NOT NULL",
        "CREATE INDEX IF NOT EXISTS idx_raw_items_unprocessed
            ON raw_items (created_at) WHERE processed = FALSE",
        "CREATE TABLE IF NOT EXISTS guides (
            id UUID PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            summary TEXT NOT NULL DEFAULT '',
            steps TEXT[] NOT NULL DEFAULT '{}',
            examples TEXT[] NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'draft'
        )",
    ];

    for statement in &statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Schema migrations applied");
    Ok(())
}
