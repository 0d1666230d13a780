//! Shell-style glob matching for host names.
//!
//! `*` matches any run of characters (including `.`), `?` matches exactly one
//! character, `[...]` is a character class, everything else is literal.
//! Matching is case-sensitive; callers normalize case where they need to.
//!
//! A pattern the glob syntax rejects (e.g. an unclosed `[`) is not an error:
//! it falls back to a literal comparison, so it can only ever match the exact
//! same text.

use glob::Pattern;

/// Match `text` against the glob `pattern`.
///
/// Compiles the pattern on every call. Hot paths should hold a
/// [`HostPattern`] instead.
pub fn matches(text: &str, pattern: &str) -> bool {
    HostPattern::new(pattern).matches(text)
}

/// A host glob compiled once at load time.
#[derive(Debug, Clone)]
pub struct HostPattern {
    raw: String,
    compiled: Option<Pattern>,
}

impl HostPattern {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            compiled: Pattern::new(raw).ok(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.compiled {
            Some(pattern) => pattern.matches(text),
            None => self.raw == text,
        }
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for HostPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for HostPattern {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        assert!(matches("example.com", "*"));
        assert!(matches("", "*"));
        assert!(matches("10.0.0.1", "*"));
    }

    #[test]
    fn subdomain_wildcard() {
        assert!(matches("api.github.com", "*.github.com"));
        assert!(matches("a.b.github.com", "*.github.com"));
        assert!(!matches("github.com", "*.github.com"));
        assert!(!matches("github.com.evil.net", "*.github.com"));
        assert!(!matches("example.com", "*.github.com"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(matches("api1.example.com", "api?.example.com"));
        assert!(!matches("api.example.com", "api?.example.com"));
        assert!(!matches("api12.example.com", "api?.example.com"));
    }

    #[test]
    fn literal_pattern_is_exact() {
        assert!(matches("api.example.com", "api.example.com"));
        assert!(!matches("api.example.com.", "api.example.com"));
        assert!(!matches("xapi.example.com", "api.example.com"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!matches("API.example.com", "api.example.com"));
        assert!(!matches("api.GITHUB.com", "*.github.com"));
    }

    #[test]
    fn character_class() {
        assert!(matches("eu1.example.com", "[ae]u1.example.com"));
        assert!(!matches("us1.example.com", "[ae]u1.example.com"));
    }

    #[test]
    fn malformed_pattern_falls_back_to_literal() {
        let pattern = HostPattern::new("[unclosed");
        assert!(pattern.compiled.is_none());
        assert!(pattern.matches("[unclosed"));
        assert!(!matches("unclosed", "[unclosed"));
        assert!(!matches("example.com", "[unclosed"));
    }

    #[test]
    fn host_pattern_keeps_raw_text() {
        let pattern = HostPattern::new("*.github.com");
        assert_eq!(pattern.as_str(), "*.github.com");
        assert_eq!(pattern, HostPattern::new("*.github.com"));
    }
}
