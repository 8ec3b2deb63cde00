//! Slug normalization for decision file names.

use std::sync::LazyLock;

use regex::Regex;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug pattern"));

const MAX_SLUG_LEN: usize = 40;

/// Normalize a decision context into a filename-safe slug: lowercase,
/// non-alphanumeric runs collapsed to `-`, trimmed, at most 40 chars.
/// An empty result falls back to `decision`.
pub fn decision_slug(context: &str) -> String {
    let lowered = context.to_lowercase();
    let collapsed = NON_ALNUM.replace_all(&lowered, "-");
    let mut slug: String = collapsed.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "decision".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(decision_slug("Use SQLite (not Postgres)!"), "use-sqlite-not-postgres");
    }

    #[test]
    fn truncates_to_limit_without_trailing_dash() {
        let long = "a ".repeat(60);
        let slug = decision_slug(&long);
        assert!(slug.len() <= 40);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn hostile_input_becomes_safe() {
        let slug = decision_slug("`rm -rf` $(boom) '; drop --");
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert_eq!(slug, "rm-rf-boom-drop");
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(decision_slug("!!!"), "decision");
        assert_eq!(decision_slug(""), "decision");
    }
}
