//! Near-duplicate detection for guide drafts against the existing corpus.
//!
//! Deliberately recall-favoring: any one signal above its threshold
//! reports a match, and false positives go to human review.

use clearfeed_common::{DuplicateGuideResult, GuideDraft, GuideMatch, GuideRecord};
use clearfeed_store::{GuideStore, StoreError};

use crate::similarity::{edit_similarity, keyword_similarity, text_similarity};

const TITLE_THRESHOLD: f64 = 82.0;
const SUMMARY_THRESHOLD: f64 = 70.0;
const KEYWORD_THRESHOLD: f64 = 65.0;
const OVERALL_THRESHOLD: f64 = 78.0;

const TITLE_WEIGHT: f64 = 0.45;
const SUMMARY_WEIGHT: f64 = 0.25;
const KEYWORD_WEIGHT: f64 = 0.20;
const BODY_EDIT_WEIGHT: f64 = 0.10;

const MAX_MATCHES: usize = 5;

/// Compare `draft` against every guide in `corpus`. Matches are sorted by
/// overall score descending and capped at five; `highest_similarity` covers
/// all comparisons whether or not they matched (0 for an empty corpus).
pub fn find_duplicate_guides(draft: &GuideDraft, corpus: &[GuideRecord]) -> DuplicateGuideResult {
    let draft_title = draft.title.to_lowercase();
    let draft_summary = draft.summary.to_lowercase();
    let draft_body = body_text(&draft.summary, &draft.steps, &draft.examples);

    let mut matches = Vec::new();
    let mut highest = 0.0_f64;

    for guide in corpus {
        let title = text_similarity(&draft_title, &guide.title.to_lowercase());
        let summary = text_similarity(&draft_summary, &guide.summary.to_lowercase());

        let guide_body = body_text(&guide.summary, &guide.steps, &guide.examples);
        let keyword = keyword_similarity(&draft_body, &guide_body);
        let body_edit = edit_similarity(&draft_body, &guide_body);

        let overall = title * TITLE_WEIGHT
            + summary * SUMMARY_WEIGHT
            + keyword * KEYWORD_WEIGHT
            + body_edit * BODY_EDIT_WEIGHT;

        highest = highest.max(overall);

        let is_match = title >= TITLE_THRESHOLD
            || summary >= SUMMARY_THRESHOLD
            || keyword >= KEYWORD_THRESHOLD
            || overall >= OVERALL_THRESHOLD;
        if is_match {
            matches.push(GuideMatch {
                id: guide.id,
                title: guide.title.clone(),
                slug: guide.slug.clone(),
                status: guide.status.clone(),
                title_similarity: title,
                summary_similarity: summary,
                keyword_similarity: keyword,
                overall_similarity: overall,
            });
        }
    }

    matches.sort_by(|a, b| {
        b.overall_similarity
            .partial_cmp(&a.overall_similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(MAX_MATCHES);

    DuplicateGuideResult {
        matches,
        highest_similarity: highest,
    }
}

/// Load the corpus and run detection in one call.
pub async fn detect_duplicate_guides(
    draft: &GuideDraft,
    store: &dyn GuideStore,
) -> Result<DuplicateGuideResult, StoreError> {
    let corpus = store.list_guides().await?;
    Ok(find_duplicate_guides(draft, &corpus))
}

fn body_text(summary: &str, steps: &[String], examples: &[String]) -> String {
    let mut parts = vec![summary.to_string()];
    parts.extend(steps.iter().cloned());
    parts.extend(examples.iter().cloned());
    parts.join(" ").to_lowercase()
}
