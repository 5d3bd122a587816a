//! URI engine.
//!
//! # Data Flow
//! ```text
//! request line / reference text
//!     → parser.rs (split into raw components, nothing decoded)
//!     → percent.rs (decode each component, strict escapes)
//!     → path.rs (dot-segment normalisation)
//!     → query.rs (ordered key/value pairs)
//!     → Uri (owned, decoded, immutable)
//!
//! Reference resolution (resolve.rs):
//!     reference text + base Uri → component inheritance → Uri
//!
//! Serialisation (Display):
//!     Uri → percent.rs (re-encode per component charset) → text
//! ```
//!
//! # Design Decisions
//! - One owning type; borrowed access goes through accessor methods
//! - Absent and empty components are distinct (`Option<String>`), so
//!   `"gemini:"` and `"?q"` re-serialise unchanged
//! - Any malformed escape fails the whole parse

pub mod parser;
pub mod path;
pub mod percent;
pub mod query;
pub mod resolve;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use self::parser::RawParts;
use self::percent::{GENERIC, PATH};

pub use self::path::UriPath;
pub use self::query::Query;

/// Invalid-argument failures raised while decoding a URI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    /// `%` not followed by two hex digits.
    #[error("invalid percent-escape at offset {offset}")]
    InvalidEscape { offset: usize },
    /// Escapes decoded to bytes that are not UTF-8.
    #[error("percent-decoded text is not valid UTF-8")]
    NotUtf8,
}

/// A parsed, percent-decoded URI or relative reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    scheme: Option<String>,
    host: Option<String>,
    port: Option<String>,
    path: UriPath,
    query: Option<Query>,
    fragment: Option<String>,
}

impl Uri {
    /// Parse an absolute URI or a relative reference.
    pub fn parse(text: &str) -> Result<Self, UriError> {
        Self::from_raw(RawParts::split(text))
    }

    pub(crate) fn from_raw(raw: RawParts<'_>) -> Result<Self, UriError> {
        let (host, port) = match raw.authority {
            Some(authority) => (
                Some(percent::decode(authority.host)?),
                decode_opt(authority.port)?,
            ),
            None => (None, None),
        };

        Ok(Self {
            scheme: decode_opt(raw.scheme)?,
            host,
            port,
            path: UriPath::new(&percent::decode(raw.path)?),
            query: raw.query.map(Query::parse).transpose()?,
            fragment: decode_opt(raw.fragment)?,
        })
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn path(&self) -> &UriPath {
        &self.path
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// True if the URI carries an authority (`//host[:port]`).
    pub fn has_authority(&self) -> bool {
        self.host.is_some() || self.port.is_some()
    }
}

fn decode_opt(raw: Option<&str>) -> Result<Option<String>, UriError> {
    raw.map(percent::decode).transpose()
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}:", percent::encode(scheme, &GENERIC))?;
        }

        if self.has_authority() {
            f.write_str("//")?;
            if let Some(host) = &self.host {
                f.write_str(&percent::encode(host, &GENERIC))?;
            }
            if let Some(port) = &self.port {
                write!(f, ":{}", percent::encode(port, &GENERIC))?;
            }
            // A relative path directly after the authority would fuse with it.
            if !self.path.is_empty() && !self.path.is_absolute() {
                f.write_str("/")?;
            }
        }

        let path = percent::encode(self.path.as_str(), &PATH);
        if self.scheme.is_none() && !self.has_authority() && !self.path.is_absolute() {
            // A ':' in the first segment would read back as a scheme.
            let end = path.find('/').unwrap_or(path.len());
            f.write_str(&path[..end].replace(':', "%3a"))?;
            f.write_str(&path[end..])?;
        } else {
            f.write_str(&path)?;
        }

        if let Some(query) = &self.query {
            write!(f, "?{}", query.encode())?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", percent::encode(fragment, &PATH))?;
        }
        Ok(())
    }
}
