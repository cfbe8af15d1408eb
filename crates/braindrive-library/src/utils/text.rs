// Text normalization helpers
//
// Shared by the scope resolver (path/slug normalization) and the defaults
// writer (fuzzy module id matching). All functions are pure.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"[^a-z0-9]+").unwrap()
});

/// Normalize a scope path for identity comparison.
///
/// Backslashes collapse to forward slashes and leading/trailing slashes are
/// stripped. Case is preserved; callers lowercase for comparison only.
pub fn normalize_scope_path(path: &str) -> String {
    let forward = path.replace('\\', "/");
    forward.trim_matches('/').to_string()
}

/// Case-insensitive equality of two normalized scope paths.
pub fn scope_paths_equal(a: &str, b: &str) -> bool {
    normalize_scope_path(a).to_lowercase() == normalize_scope_path(b).to_lowercase()
}

/// Slugify a display name: lowercase, non-alphanumeric runs collapsed to a
/// single hyphen, trimmed.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let hyphenated = NON_ALNUM_RUN.replace_all(&lowered, "-");
    hyphenated.trim_matches('-').to_string()
}

/// Strip everything except alphanumerics and lowercase the rest.
pub fn compact_alnum(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Fuzzy token match used when resolving a module id against page content.
///
/// Tokens match when their compacted forms are equal, or when one contains
/// the other. Empty compacted tokens never match.
pub fn fuzzy_token_match(a: &str, b: &str) -> bool {
    let ca = compact_alnum(a);
    let cb = compact_alnum(b);
    if ca.is_empty() || cb.is_empty() {
        return false;
    }
    ca == cb || ca.contains(&cb) || cb.contains(&ca)
}

/// Whether an id/name "looks like" the capture module.
pub fn looks_like_capture_module(value: &str) -> bool {
    compact_alnum(value).contains("librarycapture")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_slashes() {
        assert_eq!(normalize_scope_path("/life/career/"), "life/career");
        assert_eq!(normalize_scope_path("projects\\active\\demo"), "projects/active/demo");
    }

    #[test]
    fn test_normalize_preserves_case() {
        assert_eq!(normalize_scope_path("/Life/Career"), "Life/Career");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = ["/life/career/", "projects\\active\\demo", "", "///", "a/b"];
        for input in inputs {
            let once = normalize_scope_path(input);
            assert_eq!(normalize_scope_path(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_scope_paths_equal_case_insensitive() {
        assert!(scope_paths_equal("/Life/Career", "life/career"));
        assert!(!scope_paths_equal("life/career", "life/fitness"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Project!"), "my-project");
        assert_eq!(slugify("  Why__Finder  "), "why-finder");
        assert_eq!(slugify("career"), "career");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_compact_alnum() {
        assert_eq!(compact_alnum("Library-Capture_01"), "librarycapture01");
        assert_eq!(compact_alnum("***"), "");
    }

    #[test]
    fn test_fuzzy_token_match() {
        assert!(fuzzy_token_match("LibraryCapture", "library-capture"));
        assert!(fuzzy_token_match("abc_LibraryCapture", "LibraryCapture"));
        assert!(!fuzzy_token_match("LibraryEditor", "LibraryCapture"));
        assert!(!fuzzy_token_match("", "LibraryCapture"));
        assert!(!fuzzy_token_match("---", "___"));
    }

    #[test]
    fn test_looks_like_capture_module() {
        assert!(looks_like_capture_module("LibraryCapture"));
        assert!(looks_like_capture_module("my-library-capture-panel"));
        assert!(!looks_like_capture_module("LibraryEditor"));
    }
}
