//! Canonicalizer — title, URL, tag, and timestamp normalization for one
//! raw record. All functions are pure and total: malformed input falls
//! back to the original value rather than erroring.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use url::Url;

use clearfeed_common::{RawPayload, ResolvedSource};

/// Separators checked for a trailing source-name segment, in match order.
const TITLE_SEPARATORS: &[&str] = &[" | ", " — ", " – ", " - "];

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

fn utm_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^utm_").expect("valid regex"))
}

// ---------------------------------------------------------------------------
// Title
// ---------------------------------------------------------------------------

/// Clean a raw feed title: unwrap CDATA, strip markup, decode HTML
/// entities, collapse whitespace, and drop a trailing source-name segment
/// (`"Cool Post | TechBlog"` with known source "TechBlog" → `"Cool Post"`).
///
/// An empty result is still returned; filtering is not this layer's job.
pub fn clean_title(raw: &str, source_name: Option<&str>, hostname: Option<&str>) -> String {
    let unwrapped = unwrap_cdata(raw);
    let stripped = markup_re().replace_all(unwrapped, " ");
    let decoded = decode_entities(&stripped);
    let collapsed = collapse_whitespace(&decoded);
    strip_source_suffix(&collapsed, source_name, hostname)
}

fn unwrap_cdata(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(trimmed)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the HTML entities feeds actually emit, plus numeric references.
/// Unknown entities pass through untouched.
fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        // Entity names are short; a distant semicolon means a bare ampersand.
        let end = match rest.find(';') {
            Some(e) if e > 1 && e <= 10 => e,
            _ => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };

        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_source_suffix(title: &str, source_name: Option<&str>, hostname: Option<&str>) -> String {
    let mut known: Vec<String> = Vec::new();
    if let Some(name) = source_name {
        let lower = name.trim().to_lowercase();
        if !lower.is_empty() {
            known.push(format!("{lower} blog"));
            known.push(lower);
        }
    }
    if let Some(host) = hostname {
        known.push(host.trim().to_lowercase());
    }
    if known.is_empty() {
        return title.to_string();
    }

    for sep in TITLE_SEPARATORS {
        let parts: Vec<&str> = title.split(sep).collect();
        if parts.len() != 2 {
            continue;
        }
        let trailing = parts[1].trim().to_lowercase();
        if known.iter().any(|k| *k == trailing) {
            return parts[0].trim().to_string();
        }
    }
    title.to_string()
}

// ---------------------------------------------------------------------------
// URL
// ---------------------------------------------------------------------------

/// Canonicalize a URL: drop tracking parameters (`utm_*`, `fbclid`), sort
/// the surviving query pairs by key, strip the fragment, and strip a
/// trailing slash from non-root paths. Idempotent; malformed URLs pass
/// through unchanged.
pub fn canonical_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let mut pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.sort();

        if pairs.is_empty() {
            parsed.set_query(None);
        } else {
            // Re-encode through the form serializer so decoded pairs
            // cannot leak structural characters back into the query.
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&pairs)
                .finish();
            parsed.set_query(Some(&query));
        }
    }

    let mut out = parsed.to_string();
    if out.ends_with('/') && parsed.path() != "/" {
        out.pop();
    }
    out
}

fn is_tracking_param(key: &str) -> bool {
    utm_re().is_match(key) || key == "fbclid"
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Union of existing tags, source category, source id, hostname, and
/// payload categories; trimmed, de-duplicated, sorted lexicographically.
pub fn merge_tags(
    existing: &[String],
    source: &ResolvedSource,
    hostname: Option<&str>,
    payload: &RawPayload,
) -> Vec<String> {
    let mut set = BTreeSet::new();
    for tag in existing {
        let tag = tag.trim();
        if !tag.is_empty() {
            set.insert(tag.to_string());
        }
    }
    set.insert(source.category.clone());
    set.insert(source.source_id.clone());
    if let Some(host) = hostname {
        set.insert(host.to_string());
    }
    for category in payload.categories() {
        set.insert(category);
    }
    set.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// Resolve the publish instant: an already-valid upstream timestamp wins;
/// otherwise the payload's date candidates are scanned in priority order.
pub fn resolve_timestamp(raw: Option<&str>, payload: &RawPayload) -> Option<DateTime<Utc>> {
    if let Some(instant) = raw.and_then(parse_instant) {
        return Some(instant);
    }
    payload.date_candidates().find_map(parse_instant)
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearfeed_common::{EvidenceLevel, SourceKind};
    use serde_json::json;

    fn source(id: &str, category: &str) -> ResolvedSource {
        ResolvedSource {
            source_id: id.to_string(),
            category: category.to_string(),
            evidence: Some(EvidenceLevel::B),
            kind: Some(SourceKind::Rss),
        }
    }

    // --- title ---

    #[test]
    fn title_drops_known_source_suffix() {
        assert_eq!(
            clean_title("Cool Post | TechBlog", Some("TechBlog"), None),
            "Cool Post"
        );
    }

    #[test]
    fn title_drops_hostname_suffix() {
        assert_eq!(
            clean_title("Cool Post - techblog.com", None, Some("techblog.com")),
            "Cool Post"
        );
    }

    #[test]
    fn title_drops_name_blog_suffix() {
        assert_eq!(
            clean_title("Cool Post | TechBlog Blog", Some("TechBlog"), None),
            "Cool Post"
        );
    }

    #[test]
    fn title_keeps_unknown_suffix() {
        assert_eq!(
            clean_title("Cool Post | SomeoneElse", Some("TechBlog"), Some("techblog.com")),
            "Cool Post | SomeoneElse"
        );
    }

    #[test]
    fn title_keeps_three_part_split() {
        assert_eq!(
            clean_title("A | B | TechBlog", Some("TechBlog"), None),
            "A | B | TechBlog"
        );
    }

    #[test]
    fn title_unwraps_cdata_and_decodes_entities() {
        assert_eq!(
            clean_title("<![CDATA[Ben &amp; Jerry&#39;s]]>", None, None),
            "Ben & Jerry's"
        );
    }

    #[test]
    fn title_strips_markup_and_collapses_whitespace() {
        assert_eq!(
            clean_title("  <b>Big</b>   News\n<i>today</i> ", None, None),
            "Big News today"
        );
    }

    #[test]
    fn title_empty_after_cleanup_is_emitted() {
        assert_eq!(clean_title("<p></p>", None, None), "");
    }

    #[test]
    fn title_bare_ampersand_survives() {
        assert_eq!(clean_title("AT&T expands fiber", None, None), "AT&T expands fiber");
    }

    // --- url ---

    #[test]
    fn url_strips_tracking_and_sorts() {
        assert_eq!(
            canonical_url("https://x.com/a?utm_source=t&b=2"),
            "https://x.com/a?b=2"
        );
        assert_eq!(
            canonical_url("https://x.com/a?z=1&a=2&fbclid=abc"),
            "https://x.com/a?a=2&z=1"
        );
    }

    #[test]
    fn url_utm_match_is_case_insensitive() {
        assert_eq!(
            canonical_url("https://x.com/a?UTM_Medium=email&b=2"),
            "https://x.com/a?b=2"
        );
    }

    #[test]
    fn url_strips_fragment_and_trailing_slash() {
        assert_eq!(canonical_url("https://x.com/a/#section"), "https://x.com/a");
    }

    #[test]
    fn url_root_path_keeps_slash() {
        assert_eq!(canonical_url("https://x.com/"), "https://x.com/");
    }

    #[test]
    fn url_without_query_is_noop() {
        assert_eq!(canonical_url("https://x.com/a"), "https://x.com/a");
    }

    #[test]
    fn url_malformed_passes_through() {
        assert_eq!(canonical_url("not a url"), "not a url");
        assert_eq!(canonical_url(""), "");
    }

    #[test]
    fn url_encoded_ampersand_in_value_stays_encoded() {
        assert_eq!(
            canonical_url("https://x.com/a?b=1%262"),
            "https://x.com/a?b=1%262"
        );
    }

    #[test]
    fn url_canonicalization_is_idempotent() {
        let inputs = [
            "https://x.com/a?utm_source=t&b=2&a=1",
            "https://x.com/a/?z=&fbclid=zz#frag",
            "https://x.com/a?b=1%262&c=x%3Dy",
            "https://x.com/",
            "https://Example.COM/Path/",
            "not a url",
        ];
        for input in inputs {
            let once = canonical_url(input);
            assert_eq!(canonical_url(&once), once, "not a fixed point for {input}");
        }
    }

    #[test]
    fn url_equal_after_tracking_removal() {
        assert_eq!(
            canonical_url("https://x.com/a?utm_source=t&b=2"),
            canonical_url("https://x.com/a?b=2")
        );
    }

    // --- tags ---

    #[test]
    fn tags_union_sorted_deduped() {
        let payload = RawPayload::new().with("categories", json!(["ai", "news"]));
        let tags = merge_tags(
            &["news".to_string(), "  ".to_string(), "zebra".to_string()],
            &source("techblog", "engineering"),
            Some("techblog.com"),
            &payload,
        );
        assert_eq!(
            tags,
            vec!["ai", "engineering", "news", "techblog", "techblog.com", "zebra"]
        );
    }

    // --- timestamp ---

    #[test]
    fn timestamp_keeps_valid_upstream_value() {
        let payload = RawPayload::new().with("pubDate", json!("2020-01-01T00:00:00Z"));
        let resolved = resolve_timestamp(Some("2026-03-01T12:30:00+02:00"), &payload).unwrap();
        assert_eq!(resolved.to_rfc3339(), "2026-03-01T10:30:00+00:00");
    }

    #[test]
    fn timestamp_falls_back_to_payload_in_priority_order() {
        let payload = RawPayload::new()
            .with("updated_at", json!("2026-05-05T00:00:00Z"))
            .with("pubDate", json!("Mon, 05 Jan 2026 10:00:00 GMT"));
        let resolved = resolve_timestamp(Some("yesterday-ish"), &payload).unwrap();
        assert_eq!(resolved.to_rfc3339(), "2026-01-05T10:00:00+00:00");
    }

    #[test]
    fn timestamp_parses_bare_date() {
        let payload = RawPayload::new().with("date", json!("2026-02-14"));
        let resolved = resolve_timestamp(None, &payload).unwrap();
        assert_eq!(resolved.to_rfc3339(), "2026-02-14T00:00:00+00:00");
    }

    #[test]
    fn timestamp_none_when_nothing_parses() {
        let payload = RawPayload::new().with("date", json!("not a date"));
        assert_eq!(resolve_timestamp(None, &payload), None);
    }
}
