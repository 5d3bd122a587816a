//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store prefix → handler routes in segment order
//! - Find the longest registered prefix containing a request path
//! - Compute the handler-relative path info
//!
//! # Design Decisions
//! - Immutable after construction (shared via `Arc`, no locks)
//! - Exact hit is a single map lookup
//! - Otherwise walk predecessors from the greatest key ≤ the path; every
//!   containing prefix sorts before the path, and the first one found is the
//!   longest
//! - Explicit `None` rather than a silent default handler

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::RouteConfig;
use crate::handlers::StaticFiles;
use crate::protocol::Handler;
use crate::routing::matcher::path_info;
use crate::uri::UriPath;

/// A successful lookup.
pub struct RouteMatch<'a> {
    pub prefix: &'a UriPath,
    pub handler: &'a Arc<dyn Handler>,
    pub path_info: UriPath,
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("prefix", &self.prefix)
            .field("path_info", &self.path_info)
            .finish_non_exhaustive()
    }
}

/// Ordered table of path prefixes.
#[derive(Default, Clone)]
pub struct Router {
    routes: BTreeMap<UriPath, Arc<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router serving each configured route from its root directory.
    pub fn from_config(routes: &[RouteConfig]) -> Self {
        let mut router = Self::new();
        for route in routes {
            tracing::info!(prefix = %route.prefix, root = %route.root.display(), "Route registered");
            router.insert(&route.prefix, Arc::new(StaticFiles::new(&route.root)));
        }
        router
    }

    /// Register `handler` under `prefix`, replacing any previous handler for
    /// the same (normalised) prefix.
    pub fn insert(&mut self, prefix: &str, handler: Arc<dyn Handler>) -> Option<Arc<dyn Handler>> {
        self.routes.insert(UriPath::new(prefix), handler)
    }

    /// Builder form of [`Router::insert`].
    pub fn route(mut self, prefix: &str, handler: impl Handler + 'static) -> Self {
        self.insert(prefix, Arc::new(handler));
        self
    }

    /// Find the handler for `path`.
    pub fn lookup(&self, path: &UriPath) -> Option<RouteMatch<'_>> {
        if let Some((prefix, handler)) = self.routes.get_key_value(path) {
            return Some(RouteMatch {
                prefix,
                handler,
                path_info: UriPath::empty(),
            });
        }

        self.routes
            .range(..=path)
            .rev()
            .find_map(|(prefix, handler)| {
                path_info(prefix, path).map(|path_info| RouteMatch {
                    prefix,
                    handler,
                    path_info,
                })
            })
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &UriPath> {
        self.routes.keys()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.routes.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HandlerResult, Request, Response};
    use async_trait::async_trait;

    struct Named;

    #[async_trait]
    impl Handler for Named {
        async fn handle(&self, _request: &Request<'_>, _response: &mut Response<'_>) -> HandlerResult {
            Ok(())
        }
    }

    fn router(prefixes: &[&str]) -> Router {
        prefixes.iter().fold(Router::new(), |router, prefix| router.route(prefix, Named))
    }

    fn lookup(router: &Router, path: &str) -> Option<(String, String)> {
        router
            .lookup(&UriPath::new(path))
            .map(|m| (m.prefix.to_string(), m.path_info.to_string()))
    }

    fn hit(prefix: &str, info: &str) -> Option<(String, String)> {
        Some((prefix.to_string(), info.to_string()))
    }

    #[test]
    fn test_exact_match_has_empty_path_info() {
        let router = router(&["/asdf"]);
        assert_eq!(lookup(&router, "/asdf"), hit("/asdf", ""));
    }

    #[test]
    fn test_prefix_match_computes_path_info() {
        let router = router(&["/asdf"]);
        assert_eq!(lookup(&router, "/asdf/x"), hit("/asdf", "x"));
        assert_eq!(lookup(&router, "/asdfg"), None);
        assert_eq!(lookup(&router, "/"), None);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let router = router(&["/", "/a", "/a/b", "/a-b"]);
        assert_eq!(lookup(&router, "/a/b/c"), hit("/a/b", "c"));
        assert_eq!(lookup(&router, "/a/c"), hit("/a", "c"));
        assert_eq!(lookup(&router, "/a-b/x"), hit("/a-b", "x"));
        assert_eq!(lookup(&router, "/ab"), hit("/", "ab"));
    }

    #[test]
    fn test_no_routes() {
        let router = Router::new();
        assert!(router.is_empty());
        assert_eq!(lookup(&router, "/x"), None);
    }

    #[test]
    fn test_prefixes_are_normalised() {
        let router = router(&["/docs/./guide/"]);
        assert_eq!(router.prefixes().next().map(|p| p.as_str()), Some("/docs/guide/"));
        assert_eq!(lookup(&router, "/docs/guide/intro"), hit("/docs/guide/", "intro"));
    }
}
