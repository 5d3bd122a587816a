//! Query strings as ordered multi-maps.

use crate::uri::percent::{self, QUERY};
use crate::uri::UriError;

/// Decoded query pairs in the order they were parsed.
///
/// Duplicate keys are kept. A segment without `=` has an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the raw text between `?` and `#`.
    ///
    /// Splits on `&`, then each segment on its first `=`. Keys and values are
    /// decoded independently; empty segments are skipped.
    pub fn parse(raw: &str) -> Result<Self, UriError> {
        let mut pairs = Vec::new();
        for segment in raw.split('&').filter(|segment| !segment.is_empty()) {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            pairs.push((percent::decode(key)?, percent::decode(value)?));
        }
        Ok(Self { pairs })
    }

    /// Append a pair, keeping any existing pairs with the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialise as `k=v&k2=v2`, omitting `=` for empty values.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (index, (key, value)) in self.pairs.iter().enumerate() {
            if index > 0 {
                out.push('&');
            }
            out.push_str(&percent::encode(key, &QUERY));
            if !value.is_empty() {
                out.push('=');
                out.push_str(&percent::encode(value, &QUERY));
            }
        }
        out
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
