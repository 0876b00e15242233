//! Path parsing and validation.
//!
//! `/` is the separator; a path is a `/`-prefixed sequence of non-empty
//! names, and `/` alone denotes the root. Names may not contain `/` or be
//! empty.

use super::error::{NamespaceError, PathContext};

/// Splits an absolute path into its non-empty name components.
///
/// `"/"` yields an empty component list (the root). Any empty component
/// (e.g. from `"//a"` or a trailing slash other than the bare root) is
/// rejected as `InvalidPath`.
pub fn split(path: &str) -> Result<Vec<&str>, NamespaceError> {
    if !path.starts_with('/') {
        return Err(NamespaceError::InvalidPath(
            PathContext::new().with_path(path),
        ));
    }
    if path == "/" {
        return Ok(Vec::new());
    }
    let mut components = Vec::new();
    for part in path.split('/').skip(1) {
        if part.is_empty() {
            return Err(NamespaceError::InvalidPath(
                PathContext::new().with_path(path),
            ));
        }
        components.push(part);
    }
    Ok(components)
}

/// Joins name components back into an absolute path.
pub fn join<'a>(components: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in components {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Splits a path into (parent components, leaf name).
///
/// Fails `InvalidPath` for the root itself, which has no parent.
pub fn split_parent(path: &str) -> Result<(Vec<&str>, &str), NamespaceError> {
    let components = split(path)?;
    match components.split_last() {
        Some((leaf, parent)) => Ok((parent.to_vec(), leaf)),
        None => Err(NamespaceError::InvalidPath(
            PathContext::new().with_path(path),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_splits_to_no_components() {
        assert_eq!(split("/").unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn nested_path_splits_in_order() {
        assert_eq!(split("/a/b/c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_leading_slash_is_invalid() {
        assert!(split("a/b").is_err());
    }

    #[test]
    fn double_slash_is_invalid() {
        assert!(split("/a//b").is_err());
    }

    #[test]
    fn join_round_trips_split() {
        let components = split("/a/b/c").unwrap();
        assert_eq!(join(components), "/a/b/c");
    }

    #[test]
    fn root_has_no_parent() {
        assert!(split_parent("/").is_err());
    }

    #[test]
    fn split_parent_separates_leaf() {
        let (parent, leaf) = split_parent("/a/b").unwrap();
        assert_eq!(parent, vec!["a"]);
        assert_eq!(leaf, "b");
    }
}
