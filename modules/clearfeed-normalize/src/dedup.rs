//! Duplicate resolver: claim the canonical slot for one record and react
//! to uniqueness conflicts.
//!
//! The store's unique keys are the single arbiter of who wins a race; the
//! resolver never predicts or locks, it reacts to the typed claim outcome.

use tracing::{info, warn};

use clearfeed_common::{CanonicalRecord, DuplicateStatus, RawItem};
use clearfeed_store::{ClaimOutcome, ConflictKind, ItemStore};

/// Terminal state of one record after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The record claimed its fingerprint and canonical URL.
    Normalized,
    /// An existing record holds the identity; this one now points at it.
    Duplicate,
    /// Parked for manual follow-up; never retried by later runs.
    Skipped,
}

/// Attempt the canonical claim and resolve whatever comes back. A single
/// record's failure never propagates; the worst case is `Skipped`.
pub async fn resolve_record(
    store: &dyn ItemStore,
    item: &RawItem,
    record: &CanonicalRecord,
    fingerprint: &str,
) -> RecordOutcome {
    match store.claim_canonical(item.id, record, fingerprint).await {
        Ok(ClaimOutcome::Claimed) => RecordOutcome::Normalized,
        Ok(ClaimOutcome::Conflict(kind)) => {
            resolve_conflict(store, item, record, fingerprint, kind).await
        }
        Err(err) => {
            skip(store, item, &format!("storage error during claim: {err}")).await
        }
    }
}

async fn resolve_conflict(
    store: &dyn ItemStore,
    item: &RawItem,
    record: &CanonicalRecord,
    fingerprint: &str,
    kind: ConflictKind,
) -> RecordOutcome {
    let by_fingerprint = match store.find_by_fingerprint(fingerprint).await {
        Ok(found) => found,
        Err(err) => {
            return skip(store, item, &format!("storage error during conflict lookup: {err}")).await
        }
    };
    let by_url = match store.find_by_canonical_url(&record.canonical_url).await {
        Ok(found) => found,
        Err(err) => {
            return skip(store, item, &format!("storage error during conflict lookup: {err}")).await
        }
    };

    // Intended precedence when the two keys disagree is undefined upstream;
    // fingerprint wins here, and the inconsistency is surfaced for an
    // operator.
    if let (Some(a), Some(b)) = (&by_fingerprint, &by_url) {
        if a.id != b.id {
            warn!(
                record_id = %item.id,
                fingerprint_holder = %a.id,
                url_holder = %b.id,
                "Fingerprint and canonical URL conflicts point at different records"
            );
        }
    }

    let Some(conflicting) = by_fingerprint.or(by_url) else {
        return skip(store, item, "uniqueness conflict but no conflicting record found").await;
    };

    if conflicting.id == item.id {
        // The claim collided with this record's own previous write.
        return skip(store, item, "claim conflicted with the record itself").await;
    }

    // Point at the canonical root, never at another duplicate. The relation
    // has depth one, so a single hop suffices.
    let canonical_id = match conflicting.duplicate_status() {
        DuplicateStatus::Canonical => conflicting.id,
        DuplicateStatus::DuplicateOf(root) => root,
    };

    match store.mark_duplicate(item.id, record, canonical_id).await {
        Ok(()) => {
            info!(
                record_id = %item.id,
                duplicate_of = %canonical_id,
                conflict = ?kind,
                "Record resolved as duplicate"
            );
            RecordOutcome::Duplicate
        }
        Err(err) => skip(store, item, &format!("storage error marking duplicate: {err}")).await,
    }
}

async fn skip(store: &dyn ItemStore, item: &RawItem, reason: &str) -> RecordOutcome {
    warn!(record_id = %item.id, reason, "Record skipped");
    if let Err(err) = store.mark_skipped(item.id, reason).await {
        warn!(record_id = %item.id, error = %err, "Failed to persist skip marker");
    }
    RecordOutcome::Skipped
}
