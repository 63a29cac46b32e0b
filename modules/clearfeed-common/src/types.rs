//! Core data types shared across the clearfeed workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RawItem — one content record from an external feed
// ---------------------------------------------------------------------------

/// A content record as written by the ingestion collaborator.
///
/// Created with `processed = false`; mutated exactly once by the
/// normalization batch (which sets the canonical fields and flips
/// `processed`); never deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    pub id: Uuid,
    pub source_id: Option<String>,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub tags: Vec<String>,
    /// Feed-level GUID, when the upstream entry carried one.
    pub guid: Option<String>,
    /// Publish timestamp as delivered upstream, unvalidated. The
    /// canonicalizer resolves it (or a payload fallback) to UTC.
    pub published_at: Option<String>,
    pub payload: RawPayload,

    // Written back by the duplicate resolver.
    pub canonical_url: Option<String>,
    pub content_hash: Option<String>,
    /// Publish timestamp resolved to UTC, when one could be parsed.
    pub published_utc: Option<DateTime<Utc>>,
    pub processed: bool,
    pub is_duplicate: bool,
    pub duplicate_of: Option<Uuid>,
    /// Why the record was parked for manual follow-up, if it was.
    pub skip_reason: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl RawItem {
    /// Hostname of the record's URL, lowercased. `None` for unparseable URLs.
    pub fn hostname(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    }

    /// The duplicate relation as a sum type. Items that have not been
    /// processed yet report `Canonical`; the resolver is the only writer.
    pub fn duplicate_status(&self) -> DuplicateStatus {
        match self.duplicate_of {
            Some(canonical_id) if self.is_duplicate => DuplicateStatus::DuplicateOf(canonical_id),
            _ => DuplicateStatus::Canonical,
        }
    }
}

/// The duplicate relation. The DAG has depth exactly one: a duplicate
/// always points at a canonical record, never at another duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStatus {
    Canonical,
    DuplicateOf(Uuid),
}

// ---------------------------------------------------------------------------
// RawPayload — heterogeneous upstream key/value bag
// ---------------------------------------------------------------------------

/// Candidate payload fields for a publish date, in priority order.
pub const DATE_FIELDS: &[&str] = &[
    "published_at",
    "pubDate",
    "published",
    "date",
    "dc:date",
    "created_at",
    "updated_at",
    "timestamp",
];

/// The raw upstream payload: a bag of whatever the feed handed us.
///
/// Wrapped so canonicalization goes through explicit per-key accessors
/// instead of untyped dictionary access scattered across call sites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Map<String, Value>);

impl RawPayload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build from an arbitrary JSON value. Non-object values yield an
    /// empty payload rather than an error.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Builder-style insert, used by tests and the ingestion collaborator.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Upstream category hint (single value).
    pub fn category(&self) -> Option<&str> {
        self.str_field("category")
    }

    /// Upstream evidence-level hint.
    pub fn evidence(&self) -> Option<&str> {
        self.str_field("evidence")
    }

    /// Upstream transport-type hint.
    pub fn source_kind(&self) -> Option<&str> {
        self.str_field("type").or_else(|| self.str_field("source_type"))
    }

    /// All category strings found in the payload: a `categories` array,
    /// plus the single `category` field if present.
    pub fn categories(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(Value::Array(items)) = self.0.get("categories") {
            for item in items {
                if let Some(s) = item.as_str() {
                    let s = s.trim();
                    if !s.is_empty() {
                        out.push(s.to_string());
                    }
                }
            }
        }
        if let Some(single) = self.category() {
            out.push(single.to_string());
        }
        out
    }

    /// Publish-date candidates in fixed priority order.
    pub fn date_candidates(&self) -> impl Iterator<Item = &str> {
        DATE_FIELDS.iter().filter_map(|key| self.str_field(key))
    }
}

// ---------------------------------------------------------------------------
// Source registry entries
// ---------------------------------------------------------------------------

/// Transport type of a registered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rss,
    Json,
}

impl SourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rss" => Some(Self::Rss),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Evidence level assigned to a registered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceLevel {
    A,
    B,
    C,
}

impl EvidenceLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            _ => None,
        }
    }
}

/// One entry from the source registry document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub kind: SourceKind,
    pub url: String,
    pub category: String,
    pub evidence: EvidenceLevel,
    pub frequency_minutes: u32,
}

impl SourceConfig {
    /// Hostname of the source's URL, lowercased.
    pub fn hostname(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    }
}

/// Source attribution resolved for one record. Rules 2, 4, and 5 of the
/// resolution order produce entries with no registry backing, so category
/// falls back and evidence/kind may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub source_id: String,
    pub category: String,
    pub evidence: Option<EvidenceLevel>,
    pub kind: Option<SourceKind>,
}

// ---------------------------------------------------------------------------
// CanonicalRecord — the normalized view of a RawItem
// ---------------------------------------------------------------------------

/// The cleaned, canonical shape of one record, as written back by the
/// duplicate resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub title: String,
    pub canonical_url: String,
    pub source: ResolvedSource,
    /// De-duplicated, lexicographically sorted.
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Guide corpus types (downstream near-duplicate detection)
// ---------------------------------------------------------------------------

/// A candidate guide produced by the drafting step (external collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideDraft {
    pub title: String,
    pub summary: String,
    pub steps: Vec<String>,
    pub examples: Vec<String>,
    pub industries: Vec<String>,
    pub tools: Vec<String>,
    pub quality_score: f32,
}

/// An existing guide from the persistence collaborator (read-only here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub steps: Vec<String>,
    pub examples: Vec<String>,
    pub status: String,
}

/// One near-duplicate hit against the guide corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideMatch {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub title_similarity: f64,
    pub summary_similarity: f64,
    pub keyword_similarity: f64,
    pub overall_similarity: f64,
}

/// Result of comparing one draft against the whole guide corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGuideResult {
    /// Matches above threshold, sorted by overall similarity descending,
    /// capped at five.
    pub matches: Vec<GuideMatch>,
    /// Highest overall score across all comparisons, matched or not.
    pub highest_similarity: f64,
}
