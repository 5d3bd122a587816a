//! Path-prefix containment.
//!
//! # Design Decisions
//! - Containment is by path segment, not by string: `/foo` contains
//!   `/foo/bar` but not `/foobar`
//! - A prefix ending in `/` contains anything that starts with it verbatim

use crate::uri::UriPath;

/// If `prefix` contains `path`, return the part of `path` below it.
///
/// The remainder never starts with a separator. An exact match yields the
/// empty path.
pub fn path_info(prefix: &UriPath, path: &UriPath) -> Option<UriPath> {
    let prefix = prefix.as_str();
    let rest = path.as_str().strip_prefix(prefix)?;

    if prefix.ends_with('/') {
        return Some(UriPath::new(rest));
    }

    match rest.strip_prefix('/') {
        Some(below) => Some(UriPath::new(below)),
        None if rest.is_empty() => Some(UriPath::empty()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(prefix: &str, path: &str) -> Option<String> {
        path_info(&UriPath::new(prefix), &UriPath::new(path)).map(|p| p.as_str().to_owned())
    }

    #[test]
    fn test_segment_prefix() {
        assert_eq!(info("/asdf", "/asdf/x").as_deref(), Some("x"));
        assert_eq!(info("/asdf", "/asdf/x/y/").as_deref(), Some("x/y/"));
        assert_eq!(info("/asdf", "/asdf").as_deref(), Some(""));
        assert_eq!(info("/asdf", "/asdf/").as_deref(), Some(""));
    }

    #[test]
    fn test_string_prefix_is_not_enough() {
        assert_eq!(info("/asdf", "/asdfg"), None);
        assert_eq!(info("/asdf", "/asd"), None);
    }

    #[test]
    fn test_prefix_with_trailing_separator() {
        assert_eq!(info("/", "/anything/here").as_deref(), Some("anything/here"));
        assert_eq!(info("/", "/").as_deref(), Some(""));
        assert_eq!(info("/docs/", "/docs/a").as_deref(), Some("a"));
        assert_eq!(info("/docs/", "/docs"), None);
    }
}
