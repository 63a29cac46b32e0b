//! Trait abstractions for the persistence boundary.
//!
//! `ItemStore` is the only surface the normalization engine sees: bounded
//! pages of unprocessed records, a typed claim operation, and the follow-up
//! writes for duplicates and skips. Uniqueness conflicts surface as a
//! `ClaimOutcome` branch, never as an error to inspect.
//!
//! These enable deterministic testing with `MemoryStore`: no network, no
//! database, no Docker.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use clearfeed_common::{CanonicalRecord, GuideRecord, RawItem};

/// Errors crossing the storage boundary. Uniqueness violations are NOT
/// errors; they come back as `ClaimOutcome::Conflict`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of attempting to claim a fingerprint + canonical URL for a record.
///
/// The store's unique constraints are the single arbiter of who wins under
/// concurrent writers; callers react to `Conflict` instead of locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// All canonical fields written; this record is now the canonical one.
    Claimed,
    /// A concurrent writer already holds this fingerprint or canonical URL.
    Conflict(ConflictKind),
}

/// Which unique key the claim collided on, when the store can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Fingerprint,
    CanonicalUrl,
    /// The backend reported a uniqueness violation without naming the key.
    Unknown,
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch up to `limit` unprocessed records, oldest created first.
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<RawItem>, StoreError>;

    /// Write all canonical fields onto the record and flip `processed`,
    /// with fingerprint and canonical URL enforced unique. Attempted once;
    /// a violation returns `Conflict`, not an error.
    async fn claim_canonical(
        &self,
        id: Uuid,
        record: &CanonicalRecord,
        fingerprint: &str,
    ) -> Result<ClaimOutcome, StoreError>;

    /// Look up the record currently holding a fingerprint.
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<RawItem>, StoreError>;

    /// Look up the record currently holding a canonical URL.
    async fn find_by_canonical_url(
        &self,
        canonical_url: &str,
    ) -> Result<Option<RawItem>, StoreError>;

    /// Mark a record as a duplicate of `canonical_id`, copying the
    /// normalized display fields (but not the unique keys, which the
    /// canonical record holds).
    async fn mark_duplicate(
        &self,
        id: Uuid,
        record: &CanonicalRecord,
        canonical_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Park a record for manual follow-up. Terminal: the batch driver will
    /// not pick it up again.
    async fn mark_skipped(&self, id: Uuid, reason: &str) -> Result<(), StoreError>;
}

/// Read-only view of the existing guide corpus.
#[async_trait]
pub trait GuideStore: Send + Sync {
    async fn list_guides(&self) -> Result<Vec<GuideRecord>, StoreError>;
}
