//! Component splitting.
//!
//! Splits `[scheme ":"] ["//" host [":" port]] path ["?" query] ["#" fragment]`
//! into raw, still-encoded slices. Decoding happens when the slices are turned
//! into a [`Uri`](crate::uri::Uri).

/// Raw components of a reference. `None` means the delimiter was absent;
/// `Some("")` means it was present with nothing after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawParts<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<Authority<'a>>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

/// Host and optional port of an authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authority<'a> {
    pub host: &'a str,
    pub port: Option<&'a str>,
}

impl<'a> RawParts<'a> {
    pub fn split(text: &'a str) -> Self {
        let mut rest = text;
        let mut parts = RawParts::default();

        // A ':' before any of '/', '?', '#' ends the scheme.
        if let Some(index) = rest.find([':', '/', '?', '#']) {
            if rest.as_bytes()[index] == b':' {
                parts.scheme = Some(&rest[..index]);
                rest = &rest[index + 1..];
            }
        }

        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find(['/', '?', '#']).unwrap_or(after.len());
            parts.authority = Some(Authority::split(&after[..end]));
            rest = &after[end..];
        }

        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        parts.path = &rest[..end];
        rest = &rest[end..];

        if let Some(after) = rest.strip_prefix('?') {
            let end = after.find('#').unwrap_or(after.len());
            parts.query = Some(&after[..end]);
            rest = &after[end..];
        }

        parts.fragment = rest.strip_prefix('#');
        parts
    }
}

impl<'a> Authority<'a> {
    /// Split off the port at the last `:`, unless a `]` closing an IPv6
    /// literal comes after it.
    fn split(authority: &'a str) -> Self {
        match authority.rfind([':', ']']) {
            Some(index) if authority.as_bytes()[index] == b':' => Self {
                host: &authority[..index],
                port: Some(&authority[index + 1..]),
            },
            _ => Self {
                host: authority,
                port: None,
            },
        }
    }
}
