//! In-memory `ItemStore`/`GuideStore` double for deterministic tests.
//!
//! Enforces the same two unique keys as the Postgres schema so the
//! conflict-reaction protocol can be exercised without a database. Phantom
//! fingerprints emulate the race where a claim collides but the winning
//! record cannot be read back; `fail_claim_for` injects a non-uniqueness
//! storage failure.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use clearfeed_common::{CanonicalRecord, GuideRecord, RawItem};

use crate::store::{ClaimOutcome, ConflictKind, GuideStore, ItemStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<Uuid, RawItem>>,
    guides: Mutex<Vec<GuideRecord>>,
    phantom_fingerprints: Mutex<HashSet<String>>,
    failing_claims: Mutex<HashSet<Uuid>>,
    fetch_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: RawItem) {
        self.items.lock().unwrap().insert(item.id, item);
    }

    pub fn get(&self, id: Uuid) -> Option<RawItem> {
        self.items.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<RawItem> {
        self.items.lock().unwrap().values().cloned().collect()
    }

    pub fn seed_guide(&self, guide: GuideRecord) {
        self.guides.lock().unwrap().push(guide);
    }

    /// Number of `fetch_unprocessed` calls so far.
    pub fn fetch_count(&self) -> usize {
        *self.fetch_calls.lock().unwrap()
    }

    /// Make claims collide on `fingerprint` even though no record holds it,
    /// emulating a winner that vanished between conflict and lookup.
    pub fn with_phantom_fingerprint(self, fingerprint: &str) -> Self {
        self.phantom_fingerprints
            .lock()
            .unwrap()
            .insert(fingerprint.to_string());
        self
    }

    /// Make `claim_canonical` fail with a non-uniqueness storage error for
    /// one record id.
    pub fn fail_claim_for(self, id: Uuid) -> Self {
        self.failing_claims.lock().unwrap().insert(id);
        self
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<RawItem>, StoreError> {
        *self.fetch_calls.lock().unwrap() += 1;
        let items = self.items.lock().unwrap();
        let mut page: Vec<RawItem> = items.values().filter(|i| !i.processed).cloned().collect();
        page.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        page.truncate(limit as usize);
        Ok(page)
    }

    async fn claim_canonical(
        &self,
        id: Uuid,
        record: &CanonicalRecord,
        fingerprint: &str,
    ) -> Result<ClaimOutcome, StoreError> {
        if self.failing_claims.lock().unwrap().contains(&id) {
            return Err(StoreError::Unavailable("injected claim failure".to_string()));
        }

        if self.phantom_fingerprints.lock().unwrap().contains(fingerprint) {
            return Ok(ClaimOutcome::Conflict(ConflictKind::Fingerprint));
        }

        let mut items = self.items.lock().unwrap();

        let fingerprint_taken = items
            .values()
            .any(|i| i.id != id && i.content_hash.as_deref() == Some(fingerprint));
        if fingerprint_taken {
            return Ok(ClaimOutcome::Conflict(ConflictKind::Fingerprint));
        }

        let url_taken = items
            .values()
            .any(|i| i.id != id && i.canonical_url.as_deref() == Some(record.canonical_url.as_str()));
        if url_taken {
            return Ok(ClaimOutcome::Conflict(ConflictKind::CanonicalUrl));
        }

        if let Some(item) = items.get_mut(&id) {
            item.title = record.title.clone();
            item.canonical_url = Some(record.canonical_url.clone());
            item.content_hash = Some(fingerprint.to_string());
            item.source_id = Some(record.source.source_id.clone());
            item.tags = record.tags.clone();
            item.published_utc = record.published_at;
            item.processed = true;
            item.is_duplicate = false;
            item.duplicate_of = None;
        }
        Ok(ClaimOutcome::Claimed)
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<RawItem>, StoreError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .find(|i| i.content_hash.as_deref() == Some(fingerprint))
            .cloned())
    }

    async fn find_by_canonical_url(
        &self,
        canonical_url: &str,
    ) -> Result<Option<RawItem>, StoreError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .find(|i| i.canonical_url.as_deref() == Some(canonical_url))
            .cloned())
    }

    async fn mark_duplicate(
        &self,
        id: Uuid,
        record: &CanonicalRecord,
        canonical_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.get_mut(&id) {
            item.title = record.title.clone();
            item.source_id = Some(record.source.source_id.clone());
            item.tags = record.tags.clone();
            item.published_utc = record.published_at;
            item.processed = true;
            item.is_duplicate = true;
            item.duplicate_of = Some(canonical_id);
        }
        Ok(())
    }

    async fn mark_skipped(&self, id: Uuid, reason: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.get_mut(&id) {
            item.processed = true;
            item.skip_reason = Some(reason.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl GuideStore for MemoryStore {
    async fn list_guides(&self) -> Result<Vec<GuideRecord>, StoreError> {
        Ok(self.guides.lock().unwrap().clone())
    }
}
