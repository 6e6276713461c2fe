//! Deterministic keyword category matcher
//!
//! Fallback classification strategy: scores each candidate category against
//! the row's title and tags with fixed additive weights. A pure function of
//! its inputs, so results are reproducible across runs. The weights are
//! behavior-compatibility constants; do not re-tune them.

use crate::models::{ClassificationResult, ClassificationSource};
use crate::services::tag_tokenizer::subtokens;
use crate::store::CategoryNode;
use restock_common::events::LogSeverity;

/// Full candidate name found as a substring of the search text
pub const SCORE_NAME_SUBSTRING: i32 = 10;
/// Each candidate-name sub-token (length >= 3) found in the search text
pub const SCORE_NAME_TOKEN: i32 = 2;
/// A tag equals the candidate name exactly (case-insensitive)
pub const SCORE_TAG_EXACT: i32 = 15;
/// A tag is a substring of the candidate name or vice versa
pub const SCORE_TAG_PARTIAL: i32 = 5;
/// Minimum accumulated score for a match
pub const MIN_MATCH_SCORE: i32 = 2;
/// Candidate-name sub-tokens shorter than this are ignored
const MIN_TOKEN_LEN: usize = 3;

/// Slug of the default bucket excluded from candidate scoring
const UNCATEGORIZED_SLUG: &str = "uncategorized";

/// Keyword scorer over a candidate category list
#[derive(Debug, Default)]
pub struct KeywordCategoryMatcher;

impl KeywordCategoryMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Score all candidates and return the best match at or above
    /// [`MIN_MATCH_SCORE`], or an unresolved result.
    ///
    /// Ties break to the first-seen candidate (comparison uses strict `>`).
    pub fn classify(
        &self,
        tags: &[String],
        title: &str,
        candidates: &[CategoryNode],
    ) -> ClassificationResult {
        let search_text = build_search_text(title, tags);

        let mut best: Option<(&CategoryNode, i32)> = None;
        for candidate in candidates {
            if candidate.slug.eq_ignore_ascii_case(UNCATEGORIZED_SLUG) {
                continue;
            }

            let score = score_candidate(candidate, &search_text, tags);
            match best {
                Some((_, best_score)) if score > best_score => best = Some((candidate, score)),
                None => best = Some((candidate, score)),
                _ => {}
            }
        }

        match best {
            Some((candidate, score)) if score >= MIN_MATCH_SCORE => {
                ClassificationResult::resolved(
                    candidate.name.clone(),
                    score as f64,
                    ClassificationSource::Keyword,
                )
                .with_trace(
                    LogSeverity::Info,
                    format!(
                        "Keyword match: '{}' (score {})",
                        candidate.name, score
                    ),
                )
            }
            _ => ClassificationResult::unresolved().with_trace(
                LogSeverity::Warning,
                "No category matched by keywords".to_string(),
            ),
        }
    }
}

/// One lowercase search string from title, raw tags, and tag sub-tokens
fn build_search_text(title: &str, tags: &[String]) -> String {
    let mut parts: Vec<String> = vec![title.to_lowercase()];
    for tag in tags {
        parts.push(tag.to_lowercase());
        parts.extend(subtokens(tag));
    }
    parts.join(" ")
}

fn score_candidate(candidate: &CategoryNode, search_text: &str, tags: &[String]) -> i32 {
    let name_lower = candidate.name.to_lowercase();
    let mut score = 0;

    if search_text.contains(&name_lower) {
        score += SCORE_NAME_SUBSTRING;
    }

    for token in name_tokens(&name_lower) {
        if search_text.contains(&token) {
            score += SCORE_NAME_TOKEN;
        }
    }

    for tag in tags {
        let tag_lower = tag.to_lowercase();
        if tag_lower == name_lower {
            score += SCORE_TAG_EXACT;
        } else if name_lower.contains(&tag_lower) || tag_lower.contains(&name_lower) {
            score += SCORE_TAG_PARTIAL;
        }
    }

    score
}

/// Candidate-name tokens: split on whitespace, ampersand and comma,
/// keeping tokens of at least [`MIN_TOKEN_LEN`] characters.
fn name_tokens(name_lower: &str) -> Vec<String> {
    name_lower
        .split(|c: char| c.is_whitespace() || c == '&' || c == ',')
        .map(str::trim)
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}
