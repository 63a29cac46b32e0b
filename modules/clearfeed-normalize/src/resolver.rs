//! Source resolution: attribute one record to a source, preferring the
//! registry, falling back to payload hints, never failing.

use clearfeed_common::{RawPayload, ResolvedSource, SourceConfig};

use crate::registry::SourceRegistry;

const UNKNOWN: &str = "unknown";

/// Resolution order:
/// 1. record's source id is registered — registry metadata wins;
/// 2. record carries an unregistered id — keep the id, fall back to
///    payload hints for the rest;
/// 3. no id, but the URL hostname matches a registered feed — adopt that
///    source wholesale;
/// 4. no id, unregistered hostname — the hostname becomes the source id;
/// 5. nothing at all — "unknown".
///
/// An id carried by the record is never overwritten by a hostname match.
pub fn resolve_source(
    source_id: Option<&str>,
    hostname: Option<&str>,
    payload: &RawPayload,
    registry: &SourceRegistry,
) -> ResolvedSource {
    if let Some(id) = source_id.map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(source) = registry.by_id(id) {
            return from_registry(source);
        }
        return from_payload(id.to_string(), payload);
    }

    if let Some(host) = hostname {
        if let Some(source) = registry.by_host(host) {
            return from_registry(source);
        }
        return from_payload(host.to_string(), payload);
    }

    from_payload(UNKNOWN.to_string(), payload)
}

fn from_registry(source: &SourceConfig) -> ResolvedSource {
    ResolvedSource {
        source_id: source.id.clone(),
        category: source.category.clone(),
        evidence: Some(source.evidence),
        kind: Some(source.kind),
    }
}

fn from_payload(source_id: String, payload: &RawPayload) -> ResolvedSource {
    ResolvedSource {
        source_id,
        category: payload.category().unwrap_or(UNKNOWN).to_string(),
        evidence: payload
            .evidence()
            .and_then(clearfeed_common::EvidenceLevel::parse),
        kind: payload
            .source_kind()
            .and_then(clearfeed_common::SourceKind::parse),
    }
}
