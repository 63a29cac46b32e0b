//! End-to-end batch runs over the in-memory store.

use chrono::{Duration, Utc};
use uuid::Uuid;

use clearfeed_common::{DuplicateStatus, RawItem, RawPayload};
use clearfeed_normalize::{BatchRunner, SourceRegistry};
use clearfeed_store::MemoryStore;

fn registry() -> SourceRegistry {
    SourceRegistry::from_json(
        r#"{"sources": [{
            "id": "techblog",
            "type": "rss",
            "url": "https://techblog.com/feed.xml",
            "category": "engineering",
            "evidence": "B",
            "frequency": 60
        }]}"#,
    )
}

fn item(seq: i64, url: &str, title: &str) -> RawItem {
    RawItem {
        id: Uuid::new_v4(),
        source_id: Some("techblog".to_string()),
        title: title.to_string(),
        url: url.to_string(),
        summary: String::new(),
        tags: Vec::new(),
        guid: None,
        published_at: None,
        payload: RawPayload::new(),
        canonical_url: None,
        content_hash: None,
        published_utc: None,
        processed: false,
        is_duplicate: false,
        duplicate_of: None,
        skip_reason: None,
        // Distinct creation instants pin down oldest-first ordering.
        created_at: Utc::now() + Duration::milliseconds(seq),
    }
}

#[tokio::test]
async fn tracking_params_make_an_exact_duplicate() {
    let store = MemoryStore::new();
    let registry = registry();
    let first = item(0, "https://x.com/a?b=2", "Cool Post");
    let second = item(1, "https://x.com/a?utm_source=t&b=2", "Cool Post");
    store.insert(first.clone());
    store.insert(second.clone());

    let stats = BatchRunner::new(&store, &registry, 200).run().await.unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.normalized, 1);
    assert_eq!(stats.duplicates, 1);

    let winner = store.get(first.id).unwrap();
    let loser = store.get(second.id).unwrap();
    assert_eq!(winner.canonical_url.as_deref(), Some("https://x.com/a?b=2"));
    assert_eq!(winner.duplicate_status(), DuplicateStatus::Canonical);
    assert_eq!(loser.duplicate_status(), DuplicateStatus::DuplicateOf(first.id));
}

#[tokio::test]
async fn shared_fingerprint_yields_exactly_one_canonical() {
    let store = MemoryStore::new();
    let registry = registry();
    let ids: Vec<Uuid> = (0..6)
        .map(|seq| {
            let it = item(seq, "https://x.com/a", "Cool Post");
            let id = it.id;
            store.insert(it);
            id
        })
        .collect();

    let stats = BatchRunner::new(&store, &registry, 200).run().await.unwrap();
    assert_eq!(stats.normalized, 1);
    assert_eq!(stats.duplicates, 5);

    let canonical: Vec<Uuid> = ids
        .iter()
        .copied()
        .filter(|id| store.get(*id).unwrap().duplicate_status() == DuplicateStatus::Canonical)
        .collect();
    assert_eq!(canonical.len(), 1);

    // Every duplicate points at the one canonical record, never at each
    // other.
    for id in &ids {
        let stored = store.get(*id).unwrap();
        if let DuplicateStatus::DuplicateOf(target) = stored.duplicate_status() {
            assert_eq!(target, canonical[0]);
        }
    }
}

#[tokio::test]
async fn backlog_of_250_drains_in_exactly_two_fetches() {
    let store = MemoryStore::new();
    let registry = registry();
    for seq in 0..250 {
        store.insert(item(seq, &format!("https://x.com/post/{seq}"), "Post"));
    }

    let stats = BatchRunner::new(&store, &registry, 200).run().await.unwrap();
    assert_eq!(stats.processed, 250);
    assert_eq!(stats.normalized, 250);
    assert_eq!(store.fetch_count(), 2);
}

#[tokio::test]
async fn rerun_after_a_full_drain_does_no_work() {
    let store = MemoryStore::new();
    let registry = registry();
    store.insert(item(0, "https://x.com/a", "Post"));

    let runner = BatchRunner::new(&store, &registry, 200);
    let first = runner.run().await.unwrap();
    assert_eq!(first.processed, 1);

    let second = runner.run().await.unwrap();
    assert_eq!(second.processed, 0);
}

#[tokio::test]
async fn vanished_conflict_skips_and_continues_the_batch() {
    let store = MemoryStore::new();
    let registry = registry();

    let poisoned = item(0, "https://x.com/poisoned", "Poisoned");
    let healthy = item(1, "https://x.com/healthy", "Healthy");

    // Pre-compute the poisoned record's fingerprint so its claim collides
    // with a record that cannot be read back.
    let scratch = MemoryStore::new();
    scratch.insert(poisoned.clone());
    BatchRunner::new(&scratch, &registry, 200).run().await.unwrap();
    let fingerprint = scratch.get(poisoned.id).unwrap().content_hash.unwrap();

    let store = store.with_phantom_fingerprint(&fingerprint);
    store.insert(poisoned.clone());
    store.insert(healthy.clone());

    let stats = BatchRunner::new(&store, &registry, 200).run().await.unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.normalized, 1);

    let parked = store.get(poisoned.id).unwrap();
    assert!(parked.processed);
    assert!(parked.skip_reason.is_some());
    assert!(store.get(healthy.id).unwrap().processed);
}

#[tokio::test]
async fn unregistered_records_still_normalize() {
    let store = MemoryStore::new();
    let registry = SourceRegistry::empty();

    let mut it = item(0, "https://newsite.io/post", "Launch Day");
    it.source_id = None;
    let id = it.id;
    store.insert(it);

    let stats = BatchRunner::new(&store, &registry, 200).run().await.unwrap();
    assert_eq!(stats.normalized, 1);

    let stored = store.get(id).unwrap();
    assert_eq!(stored.source_id.as_deref(), Some("newsite.io"));
    assert!(stored.tags.contains(&"newsite.io".to_string()));
}
