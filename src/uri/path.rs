//! Segmented, lexically normalised URI paths.

use std::cmp::Ordering;
use std::fmt;

/// A decoded URI path, always lexically normal.
///
/// Normal form has no `.` segments, no empty segments, and no `..` segment
/// preceded by a regular one. `..` segments that have nothing left to cancel
/// against stay in place, also above the root of an absolute path.
///
/// Ordering compares segment by segment, so `/a` < `/a/x` < `/a-b`. Route
/// tables rely on this: every path-prefix of a path sorts before it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UriPath(String);

impl UriPath {
    /// Normalise `raw` (already percent-decoded) into a path.
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// The empty path.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the path starts at the root.
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }

    /// True if the path names a directory, i.e. ends with a separator.
    pub fn has_trailing_separator(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Non-empty segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// Merge a relative reference path into this (base) path: the last
    /// segment of the base is replaced by `reference`, then the result is
    /// normalised.
    pub fn merge(&self, reference: &str) -> Self {
        let directory = match self.0.rfind('/') {
            Some(index) => &self.0[..=index],
            None => "",
        };
        Self::new(&format!("{directory}{reference}"))
    }
}

impl Ord for UriPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.split('/').cmp(other.0.split('/'))
    }
}

impl PartialOrd for UriPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UriPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UriPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UriPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Remove dot segments and collapse repeated separators.
///
/// Scans left to right keeping `depth`, the number of regular segments kept
/// so far that a later `..` may cancel. A leading `/` is preserved, and so is
/// a trailing one when the input names a directory (`a/`, `a/.`, `a/b/..`).
/// Idempotent.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let absolute = raw.starts_with('/');
    let mut kept: Vec<&str> = Vec::new();
    let mut depth = 0usize;
    let mut trailing = false;

    for segment in raw.split('/') {
        trailing = match segment {
            "" | "." => true,
            ".." if depth > 0 => {
                kept.pop();
                depth -= 1;
                true
            }
            ".." => {
                kept.push(segment);
                false
            }
            _ => {
                kept.push(segment);
                depth += 1;
                false
            }
        };
    }

    let mut out = String::with_capacity(raw.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&kept.join("/"));
    if trailing && !kept.is_empty() {
        out.push('/');
    }
    out
}
