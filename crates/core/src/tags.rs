//! Tag normalization shared by template writes and listing filters.

use std::collections::HashSet;

/// How a template write reconciles its requested tag set with existing links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    /// Only add links; existing links are kept.
    Additive,
    /// Drop every existing link first, so the owned set becomes exactly the
    /// requested set.
    Replace,
}

/// Trim, drop empties and deduplicate, keeping first-seen order.
///
/// Case is preserved as given; validation rejects anything outside the slug
/// charset before this runs on a write path.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

/// Split a `tags=a,b,c` query parameter into normalized tag slugs.
pub fn parse_tags_csv(csv: Option<&str>) -> Vec<String> {
    match csv {
        Some(raw) => normalize_tags(&raw.split(',').collect::<Vec<_>>()),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_dedupes_and_keeps_order() {
        let out = normalize_tags(&["  b", "a", "", "b ", "   ", "c", "a"]);
        assert_eq!(out, vec!["b", "a", "c"]);
    }

    #[test]
    fn normalize_keeps_case() {
        assert_eq!(normalize_tags(&["Anime", "anime"]), vec!["Anime", "anime"]);
    }

    #[test]
    fn csv_parsing() {
        assert_eq!(parse_tags_csv(Some("anime, retro,,anime")), vec!["anime", "retro"]);
        assert!(parse_tags_csv(Some(" , ")).is_empty());
        assert!(parse_tags_csv(None).is_empty());
    }
}
