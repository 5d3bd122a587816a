//! Reference resolution against a base URI.
//!
//! Each step decides whether a component comes from the reference or is
//! inherited from the base:
//!
//! | reference has        | scheme | authority | path         | query     | fragment  |
//! |----------------------|--------|-----------|--------------|-----------|-----------|
//! | scheme               | ref    | ref       | ref          | ref       | ref       |
//! | authority            | base   | ref       | ref          | ref       | ref       |
//! | absolute path        | base   | base      | ref          | ref       | ref       |
//! | relative path        | base   | base      | merged       | ref       | ref       |
//! | empty path, query    | base   | base      | base         | ref       | ref       |
//! | empty path, no query | base   | base      | base         | base      | ref, else base |

use crate::uri::parser::RawParts;
use crate::uri::path::UriPath;
use crate::uri::percent;
use crate::uri::query::Query;
use crate::uri::{Uri, UriError};

impl Uri {
    /// Resolve `reference` against `base`, component by component.
    pub fn resolve(reference: &str, base: &Uri) -> Result<Uri, UriError> {
        let raw = RawParts::split(reference);

        if raw.scheme.is_some() {
            return Uri::from_raw(raw);
        }

        let own_query = raw.query.map(Query::parse).transpose()?;
        let mut inherited_everything = false;

        let (host, port, path, query) = if let Some(authority) = raw.authority {
            (
                Some(percent::decode(authority.host)?),
                authority.port.map(percent::decode).transpose()?,
                UriPath::new(&percent::decode(raw.path)?),
                own_query,
            )
        } else if raw.path.is_empty() {
            let query = match own_query {
                Some(query) => Some(query),
                None => {
                    inherited_everything = true;
                    base.query.clone()
                }
            };
            (base.host.clone(), base.port.clone(), base.path.clone(), query)
        } else {
            let decoded = percent::decode(raw.path)?;
            let path = if decoded.starts_with('/') {
                UriPath::new(&decoded)
            } else if base.has_authority() && base.path.is_empty() {
                UriPath::new(&format!("/{decoded}"))
            } else {
                base.path.merge(&decoded)
            };
            (base.host.clone(), base.port.clone(), path, own_query)
        };

        let fragment = match raw.fragment {
            Some(fragment) => Some(percent::decode(fragment)?),
            None if inherited_everything => base.fragment.clone(),
            None => None,
        };

        Ok(Uri {
            scheme: base.scheme.clone(),
            host,
            port,
            path,
            query,
            fragment,
        })
    }

    /// Resolve `reference` with `self` as the base.
    pub fn join(&self, reference: &str) -> Result<Uri, UriError> {
        Uri::resolve(reference, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Uri {
        Uri::parse("gemini://example.com:8080/asdf/zxcv?foo=bar#frag").unwrap()
    }

    fn pairs(uri: &Uri) -> Vec<(&str, &str)> {
        uri.query().map(|q| q.iter().collect()).unwrap_or_default()
    }

    #[test]
    fn empty_reference_reproduces_base() {
        let base = base();
        assert_eq!(Uri::resolve("", &base).unwrap(), base);
    }

    #[test]
    fn fragment_only_keeps_everything_else() {
        let uri = Uri::resolve("#frag2", &base()).unwrap();
        assert_eq!(uri.path().as_str(), "/asdf/zxcv");
        assert_eq!(pairs(&uri), [("foo", "bar")]);
        assert_eq!(uri.fragment(), Some("frag2"));
    }

    #[test]
    fn query_only_drops_base_fragment() {
        let uri = Uri::resolve("?asdf=zxcv", &base()).unwrap();
        assert_eq!(uri.host(), Some("example.com"));
        assert_eq!(uri.path().as_str(), "/asdf/zxcv");
        assert_eq!(pairs(&uri), [("asdf", "zxcv")]);
        assert_eq!(uri.fragment(), None);
    }

    #[test]
    fn absolute_path_replaces_base_path() {
        let uri = Uri::resolve("/newroot", &base()).unwrap();
        assert_eq!(uri.scheme(), Some("gemini"));
        assert_eq!(uri.host(), Some("example.com"));
        assert_eq!(uri.port(), Some("8080"));
        assert_eq!(uri.path().as_str(), "/newroot");
        assert_eq!(uri.query(), None);
        assert_eq!(uri.fragment(), None);
    }

    #[test]
    fn relative_path_merges() {
        let uri = Uri::resolve("newfile", &base()).unwrap();
        assert_eq!(uri.path().as_str(), "/asdf/newfile");
        assert_eq!(uri.port(), Some("8080"));

        let uri = Uri::resolve("../up/./here", &base()).unwrap();
        assert_eq!(uri.path().as_str(), "/up/here");
    }

    #[test]
    fn relative_path_against_empty_base_path_is_rooted() {
        let base = Uri::parse("gemini://example.com").unwrap();
        let uri = Uri::resolve("page.gmi", &base).unwrap();
        assert_eq!(uri.path().as_str(), "/page.gmi");
    }

    #[test]
    fn authority_reference_keeps_only_scheme() {
        let uri = Uri::resolve("//newhost.example.com:1234/newroot", &base()).unwrap();
        assert_eq!(uri.scheme(), Some("gemini"));
        assert_eq!(uri.host(), Some("newhost.example.com"));
        assert_eq!(uri.port(), Some("1234"));
        assert_eq!(uri.path().as_str(), "/newroot");
        assert_eq!(uri.query(), None);
    }

    #[test]
    fn scheme_reference_ignores_base() {
        let uri = Uri::resolve("https://other:1234/x", &base()).unwrap();
        assert_eq!(uri.scheme(), Some("https"));
        assert_eq!(uri.host(), Some("other"));
        assert_eq!(uri.port(), Some("1234"));
        assert_eq!(uri.path().as_str(), "/x");
        assert_eq!(uri, Uri::parse("https://other:1234/x").unwrap());
    }

    #[test]
    fn join_serialises_resolved_reference() {
        let uri = base().join("sub/page?x=1").unwrap();
        assert_eq!(uri.to_string(), "gemini://example.com:8080/asdf/sub/page?x=1");
    }

    #[test]
    fn bad_escape_in_reference_fails() {
        assert!(Uri::resolve("bad%", &base()).is_err());
        assert!(Uri::resolve("?q=%", &base()).is_err());
    }
}
