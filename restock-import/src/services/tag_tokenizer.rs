//! Tag list parsing and sub-token expansion

/// Parse a raw comma-separated tag column into an ordered tag list.
///
/// Case is preserved and the raw list is intentionally not deduplicated;
/// duplicate tags can carry weight downstream.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercased sub-tokens of one tag, split on underscore, hyphen and
/// whitespace. "baby_shower-game" yields ["baby", "shower", "game"].
pub fn subtokens(tag: &str) -> Vec<String> {
    tag.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Deduplicated lowercase token set over all tags, order of first occurrence
/// preserved. Used to build the classifier instruction string.
pub fn dedup_tokens(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        for token in subtokens(tag) {
            if seen.insert(token.clone()) {
                out.push(token);
            }
        }
    }
    out
}
