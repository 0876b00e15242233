//! Ordered path-prefix lists, used for pin (never evict) and whitelist
//! (allowed to cache) membership checks.

/// An ordered set of absolute path prefixes. `matches` answers "is `path`
/// at or under one of these prefixes?".
#[derive(Debug, Clone, Default)]
pub struct PrefixList {
    prefixes: Vec<String>,
}

impl PrefixList {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// Parses a comma-or-semicolon-separated list of path prefixes, as read
    /// from the `WHITELIST`/`PINLIST` environment variables.
    pub fn parse(raw: &str) -> Self {
        let prefixes = raw
            .split(|c| c == ',' || c == ';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { prefixes }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// True if `path` equals a listed prefix or is nested under one.
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_matches_nothing() {
        let list = PrefixList::default();
        assert!(!list.matches("/a/b"));
    }

    #[test]
    fn exact_prefix_matches() {
        let list = PrefixList::new(vec!["/pinned".into()]);
        assert!(list.matches("/pinned"));
    }

    #[test]
    fn nested_path_matches_prefix() {
        let list = PrefixList::new(vec!["/pinned".into()]);
        assert!(list.matches("/pinned/sub/file"));
    }

    #[test]
    fn sibling_with_shared_prefix_text_does_not_match() {
        let list = PrefixList::new(vec!["/pin".into()]);
        assert!(!list.matches("/pinned/file"));
    }

    #[test]
    fn parse_splits_on_comma_and_semicolon() {
        let list = PrefixList::parse("/a,/b; /c ,, /d");
        assert_eq!(list.prefixes(), &["/a", "/b", "/c", "/d"]);
    }
}
