//! Source registry: the operator-maintained document describing known
//! feeds, loaded once at startup and indexed for attribution lookups.

use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use clearfeed_common::{EvidenceLevel, SourceConfig, SourceKind};

pub const DEFAULT_SOURCES_PATH: &str = "sources.json";

/// Registered sources indexed by id and by feed hostname.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    by_id: HashMap<String, SourceConfig>,
    by_host: HashMap<String, SourceConfig>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the registry. An explicitly configured path must be readable;
    /// the default path is allowed to be absent (the engine then runs
    /// with registry-independent attribution only).
    pub fn load_or_default(path_override: Option<&str>) -> Result<Self> {
        match path_override {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading source registry at {path}"))?;
                Ok(Self::from_json(&raw))
            }
            None => match fs::read_to_string(DEFAULT_SOURCES_PATH) {
                Ok(raw) => Ok(Self::from_json(&raw)),
                Err(err) => {
                    warn!(
                        path = DEFAULT_SOURCES_PATH,
                        error = %err,
                        "Source registry not readable, continuing with empty registry"
                    );
                    Ok(Self::empty())
                }
            },
        }
    }

    /// Parse a registry document. Malformed documents degrade to an empty
    /// registry; individually invalid entries are dropped.
    pub fn from_json(raw: &str) -> Self {
        let document: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "Source registry is not valid JSON, continuing with empty registry");
                return Self::empty();
            }
        };
        Self::from_document(&document)
    }

    fn from_document(document: &Value) -> Self {
        let Some(entries) = document.get("sources").and_then(Value::as_array) else {
            warn!("Source registry document has no `sources` array, continuing with empty registry");
            return Self::empty();
        };

        let mut registry = Self::empty();
        for entry in entries {
            match parse_entry(entry) {
                Some(source) => registry.insert(source),
                None => {
                    debug!(entry = %entry, "Dropping invalid source registry entry");
                }
            }
        }
        registry
    }

    fn insert(&mut self, source: SourceConfig) {
        if let Some(host) = source.hostname() {
            self.by_host.insert(host, source.clone());
        }
        self.by_id.insert(source.id.clone(), source);
    }

    pub fn by_id(&self, id: &str) -> Option<&SourceConfig> {
        self.by_id.get(id)
    }

    pub fn by_host(&self, host: &str) -> Option<&SourceConfig> {
        self.by_host.get(host)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn parse_entry(entry: &Value) -> Option<SourceConfig> {
    let str_field = |key: &str| entry.get(key).and_then(Value::as_str);
    // The document key is `frequency`; `frequency_minutes` is accepted as
    // an alias.
    let frequency = entry
        .get("frequency")
        .or_else(|| entry.get("frequency_minutes"))?
        .as_u64()?;
    Some(SourceConfig {
        id: str_field("id")?.to_string(),
        kind: SourceKind::parse(str_field("type")?)?,
        url: str_field("url")?.to_string(),
        category: str_field("category")?.to_string(),
        evidence: EvidenceLevel::parse(str_field("evidence")?)?,
        frequency_minutes: frequency as u32,
    })
}
