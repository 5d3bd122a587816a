//! Request line reading and validation.
//!
//! # Responsibilities
//! - Read one CRLF-terminated line, at most 1024 bytes before the terminator
//! - Parse it as an absolute `gemini:` URI with an absolute path
//! - Classify failures: transport errors close silently, everything else
//!   becomes a `59` with a readable meta
//!
//! # Design Decisions
//! - Reads never go past the bound, so an oversized request can't make the
//!   server buffer more than 1026 bytes
//! - End of stream before CRLF is a malformed request, not a transport error

use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::uri::{Uri, UriError, UriPath};

/// Scheme every request must carry.
pub const SCHEME: &str = "gemini";

/// Longest request accepted, not counting the CRLF.
pub const MAX_REQUEST_BYTES: usize = 1024;

const CRLF: &[u8] = b"\r\n";

/// Why a request line was rejected.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("transport error while reading request: {0}")]
    Io(#[from] std::io::Error),
    #[error("no CRLF within {limit} bytes")]
    MissingCrlf { limit: usize },
    #[error("request ended before CRLF")]
    Truncated,
    #[error("request is not UTF-8")]
    NotUtf8,
    #[error("invalid URI: {0}")]
    Uri(#[from] UriError),
    #[error("scheme is not gemini")]
    WrongScheme,
    #[error("path is not absolute")]
    RelativePath,
}

impl RequestError {
    /// True if the transport failed and no response can be sent.
    pub fn is_transport(&self) -> bool {
        matches!(self, RequestError::Io(_))
    }

    /// Meta text sent back with the `59` status.
    pub fn meta(&self) -> &'static str {
        match self {
            RequestError::MissingCrlf { .. } => "Missing CRLF.",
            RequestError::WrongScheme => "URL must start with 'gemini:'",
            RequestError::RelativePath => "URL must be absolute.",
            RequestError::Io(_)
            | RequestError::Truncated
            | RequestError::NotUtf8
            | RequestError::Uri(_) => "Request is malformed.",
        }
    }
}

/// Read one request line. The terminator is stripped.
pub async fn read_request_line<S>(stream: &mut S, limit: usize) -> Result<String, RequestError>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let capacity = limit + CRLF.len();
    let mut buf = vec![0u8; capacity];
    let mut filled = 0;

    loop {
        if filled == capacity {
            return Err(RequestError::MissingCrlf { limit });
        }

        let read = stream.read(&mut buf[filled..]).await?;
        if read == 0 {
            return Err(RequestError::Truncated);
        }

        // The terminator may straddle the previous read.
        let scan_from = filled.saturating_sub(1);
        filled += read;
        if let Some(offset) = buf[scan_from..filled]
            .windows(CRLF.len())
            .position(|window| window == CRLF)
        {
            buf.truncate(scan_from + offset);
            return String::from_utf8(buf).map_err(|_| RequestError::NotUtf8);
        }
    }
}

/// Parse and validate a request line.
pub fn parse_request_line(line: &str) -> Result<Uri, RequestError> {
    let uri = Uri::parse(line)?;
    if uri.scheme() != Some(SCHEME) {
        return Err(RequestError::WrongScheme);
    }
    if !uri.path().is_absolute() {
        return Err(RequestError::RelativePath);
    }
    Ok(uri)
}

/// A routed request as seen by a handler.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    uri: &'a Uri,
    path_info: &'a UriPath,
    server_name: Option<&'a str>,
    peer_addr: Option<SocketAddr>,
}

impl<'a> Request<'a> {
    pub fn new(uri: &'a Uri, path_info: &'a UriPath) -> Self {
        Self {
            uri,
            path_info,
            server_name: None,
            peer_addr: None,
        }
    }

    pub fn with_server_name(mut self, server_name: Option<&'a str>) -> Self {
        self.server_name = server_name;
        self
    }

    pub fn with_peer_addr(mut self, peer_addr: Option<SocketAddr>) -> Self {
        self.peer_addr = peer_addr;
        self
    }

    pub fn uri(&self) -> &'a Uri {
        self.uri
    }

    /// Path below the matched route prefix, relative (no leading `/`).
    pub fn path_info(&self) -> &'a UriPath {
        self.path_info
    }

    /// Server name negotiated during the TLS handshake, if any.
    pub fn server_name(&self) -> Option<&'a str> {
        self.server_name
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_line_and_strips_terminator() {
        let mut input: &[u8] = b"gemini://host/path\r\nextra";
        let line = read_request_line(&mut input, MAX_REQUEST_BYTES).await.unwrap();
        assert_eq!(line, "gemini://host/path");
    }

    #[tokio::test]
    async fn finds_terminator_split_across_reads() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            client.write_all(b"gemini://h/\r").await.unwrap();
            tokio::task::yield_now().await;
            client.write_all(b"\n").await.unwrap();
            client
        });
        let line = read_request_line(&mut server, MAX_REQUEST_BYTES).await.unwrap();
        assert_eq!(line, "gemini://h/");
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn accepts_exactly_the_limit() {
        let body = format!("gemini://h/{}", "a".repeat(MAX_REQUEST_BYTES - 11));
        assert_eq!(body.len(), MAX_REQUEST_BYTES);
        let input = format!("{body}\r\n");
        let mut reader = input.as_bytes();
        let line = read_request_line(&mut reader, MAX_REQUEST_BYTES).await.unwrap();
        assert_eq!(line, body);
    }

    #[tokio::test]
    async fn oversized_request_is_missing_crlf() {
        let input = format!("gemini://h/{}\r\n", "a".repeat(MAX_REQUEST_BYTES));
        let mut reader = input.as_bytes();
        let err = read_request_line(&mut reader, MAX_REQUEST_BYTES).await.unwrap_err();
        assert!(matches!(err, RequestError::MissingCrlf { .. }));
        assert_eq!(err.meta(), "Missing CRLF.");
    }

    #[tokio::test]
    async fn end_of_stream_is_malformed() {
        let mut reader: &[u8] = b"gemini://h/";
        let err = read_request_line(&mut reader, MAX_REQUEST_BYTES).await.unwrap_err();
        assert!(matches!(err, RequestError::Truncated));
        assert!(!err.is_transport());
    }

    #[test]
    fn validates_scheme_and_path() {
        assert!(parse_request_line("gemini://h/x").is_ok());
        assert!(matches!(
            parse_request_line("https://h/x"),
            Err(RequestError::WrongScheme)
        ));
        assert!(matches!(
            parse_request_line("//h/x"),
            Err(RequestError::WrongScheme)
        ));
        assert!(matches!(
            parse_request_line("gemini://h"),
            Err(RequestError::RelativePath)
        ));
        let err = parse_request_line("gemini://h/%zz").unwrap_err();
        assert_eq!(err.meta(), "Request is malformed.");
    }
}
