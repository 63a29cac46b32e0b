//! Text similarity primitives for near-duplicate detection.
//!
//! All scores are on a 0..=100 scale. Every function is symmetric in its
//! arguments.

use std::collections::HashSet;

/// Shorter tokens carry no signal for overlap scoring.
const MIN_TOKEN_LEN: usize = 4;

/// Edit-distance similarity: `100 * (1 - levenshtein / max_len)`, counted
/// in characters. Two empty strings are identical (100).
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let distance = strsim::levenshtein(a, b);
    100.0 * (1.0 - distance as f64 / max_len as f64)
}

/// Jaccard overlap of the significant token sets, as a percentage. Two
/// empty token sets are identical (100); one empty set scores 0.
pub fn keyword_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = significant_tokens(a);
    let tokens_b = significant_tokens(b);
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 100.0;
    }
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    100.0 * intersection as f64 / union as f64
}

/// Combined text similarity: the better of the edit-based and the
/// keyword-based score. Rewording that preserves vocabulary and small
/// edits that preserve shape both count as similar.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    edit_similarity(a, b).max(keyword_similarity(a, b))
}

fn significant_tokens(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(edit_similarity("abc", "abc"), 100.0);
        assert_eq!(keyword_similarity("alpha beta", "alpha beta"), 100.0);
        assert_eq!(text_similarity("alpha beta", "alpha beta"), 100.0);
    }

    #[test]
    fn both_empty_score_100() {
        assert_eq!(edit_similarity("", ""), 100.0);
        assert_eq!(keyword_similarity("", ""), 100.0);
    }

    #[test]
    fn disjoint_strings_score_low() {
        assert_eq!(keyword_similarity("alpha beta", "gamma delta"), 0.0);
        assert!(edit_similarity("aaaa", "zzzz") < 1.0);
    }

    #[test]
    fn one_empty_keyword_set_scores_zero() {
        assert_eq!(keyword_similarity("alpha beta", ""), 0.0);
        // Tokens below the length cutoff do not count either.
        assert_eq!(keyword_similarity("alpha beta", "a b c"), 0.0);
    }

    #[test]
    fn scores_are_symmetric() {
        let pairs = [
            ("how to automate invoices", "automate your invoices"),
            ("", "something"),
            ("short", "a much longer sentence entirely"),
        ];
        for (a, b) in pairs {
            assert_eq!(edit_similarity(a, b), edit_similarity(b, a));
            assert_eq!(keyword_similarity(a, b), keyword_similarity(b, a));
            assert_eq!(text_similarity(a, b), text_similarity(b, a));
        }
    }

    #[test]
    fn scores_stay_in_range() {
        let pairs = [("abc", "abd"), ("alpha beta gamma", "beta gamma delta")];
        for (a, b) in pairs {
            for score in [
                edit_similarity(a, b),
                keyword_similarity(a, b),
                text_similarity(a, b),
            ] {
                assert!((0.0..=100.0).contains(&score), "{score} out of range");
            }
        }
    }

    #[test]
    fn keyword_overlap_is_case_insensitive() {
        assert_eq!(keyword_similarity("Alpha BETA", "alpha beta"), 100.0);
    }

    #[test]
    fn combined_takes_the_better_signal() {
        // Same vocabulary, different order: keyword wins.
        let a = "invoices automate workflow";
        let b = "workflow automate invoices";
        assert_eq!(text_similarity(a, b), 100.0);
        assert!(edit_similarity(a, b) < 100.0);
    }
}
