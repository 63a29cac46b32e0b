//! Batch driver: page through unprocessed records and run each through
//! canonicalization, source resolution, fingerprinting, and the duplicate
//! resolver.

use std::fmt;

use anyhow::Result;
use tracing::{debug, info};

use clearfeed_common::{CanonicalRecord, RawItem};
use clearfeed_store::ItemStore;

use crate::canonicalize::{canonical_url, clean_title, merge_tags, resolve_timestamp};
use crate::dedup::{resolve_record, RecordOutcome};
use crate::fingerprint::content_fingerprint;
use crate::registry::SourceRegistry;
use crate::resolver::resolve_source;

/// End-of-run counters. Always fully reported, so partial failure stays
/// visible to the operator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub normalized: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} normalized={} duplicates={} skipped={}",
            self.processed, self.normalized, self.duplicates, self.skipped
        )
    }
}

pub struct BatchRunner<'a> {
    store: &'a dyn ItemStore,
    registry: &'a SourceRegistry,
    page_size: u32,
}

impl<'a> BatchRunner<'a> {
    pub fn new(store: &'a dyn ItemStore, registry: &'a SourceRegistry, page_size: u32) -> Self {
        Self {
            store,
            registry,
            page_size,
        }
    }

    /// Run to completion: fetch pages oldest-first until the backlog is
    /// drained. Safe to re-invoke; processed records are never refetched.
    pub async fn run(&self) -> Result<BatchStats> {
        let mut stats = BatchStats::default();

        loop {
            let page = self.store.fetch_unprocessed(self.page_size).await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            debug!(page_len, "Fetched unprocessed page");

            for item in &page {
                let (record, fingerprint) = self.canonical_record_for(item);
                let outcome = resolve_record(self.store, item, &record, &fingerprint).await;
                stats.processed += 1;
                match outcome {
                    RecordOutcome::Normalized => stats.normalized += 1,
                    RecordOutcome::Duplicate => stats.duplicates += 1,
                    RecordOutcome::Skipped => stats.skipped += 1,
                }
            }

            // A short page means the backlog is drained; skip the extra
            // empty fetch.
            if page_len < self.page_size as usize {
                break;
            }
        }

        info!(%stats, "Normalization batch finished");
        Ok(stats)
    }

    /// Pure composition of the leaf stages for one record.
    fn canonical_record_for(&self, item: &RawItem) -> (CanonicalRecord, String) {
        let canonical = canonical_url(&item.url);
        let hostname = item.hostname();

        let source = resolve_source(
            item.source_id.as_deref(),
            hostname.as_deref(),
            &item.payload,
            self.registry,
        );

        let title = clean_title(&item.title, Some(&source.source_id), hostname.as_deref());
        let tags = merge_tags(&item.tags, &source, hostname.as_deref(), &item.payload);
        let published_at = resolve_timestamp(item.published_at.as_deref(), &item.payload);

        let fingerprint =
            content_fingerprint(&source.source_id, &canonical, item.guid.as_deref(), &title);

        (
            CanonicalRecord {
                title,
                canonical_url: canonical,
                source,
                tags,
                published_at,
            },
            fingerprint,
        )
    }
}
