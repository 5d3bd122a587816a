//! Response writer.
//!
//! # Responsibilities
//! - Hold the status and meta until the status line is committed
//! - Commit `<code> <meta>\r\n` at most once
//! - Expose the raw transport for body bytes
//!
//! # Design Decisions
//! - Header fields are frozen once committed; later `header` calls are ignored
//! - Meta is sanitised on the way in: CR/LF become spaces and it is cut to
//!   1024 bytes, so a handler can't break status-line framing
//! - Body bytes must follow the status line; `write_body` commits first

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::protocol::status::Status;

/// Longest meta text sent on the wire, in bytes.
pub const MAX_META_BYTES: usize = 1024;

/// A byte stream a response can be written to.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized {}

/// Status line state for one exchange, bound to the connection's transport.
pub struct Response<'a> {
    stream: &'a mut (dyn Transport + 'a),
    status: Status,
    meta: String,
    committed: bool,
}

impl<'a> Response<'a> {
    pub fn new(stream: &'a mut (dyn Transport + 'a)) -> Self {
        Self {
            stream,
            status: Status::TemporaryFailure,
            meta: "Request was not handled.".to_string(),
            committed: false,
        }
    }

    /// Set status and meta. The last call before commit wins.
    pub fn header(&mut self, status: Status, meta: impl Into<String>) -> &mut Self {
        if self.committed {
            tracing::debug!(
                committed = %self.status,
                ignored = %status,
                "Header change after commit ignored"
            );
            return self;
        }
        self.status = status;
        self.meta = sanitize_meta(meta.into());
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn meta(&self) -> &str {
        &self.meta
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// The status line as it is (or would be) written.
    pub fn status_line(&self) -> String {
        format!("{} {}\r\n", self.status, self.meta)
    }

    /// Write the status line unless it was already written, then flush the
    /// transport.
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if !self.committed {
            let line = self.status_line();
            self.stream.write_all(line.as_bytes()).await?;
            self.committed = true;
        }
        self.stream.flush().await
    }

    /// Commit the status line if needed, then write `bytes` as body.
    pub async fn write_body(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.flush().await?;
        if !self.status.allows_body() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("status {} does not carry a body", self.status),
            ));
        }
        self.stream.write_all(bytes).await
    }

    /// Raw transport. Commit with [`Response::flush`] before writing to it.
    pub fn stream(&mut self) -> &mut (dyn Transport + 'a) {
        &mut *self.stream
    }
}

impl std::fmt::Debug for Response<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("meta", &self.meta)
            .field("committed", &self.committed)
            .finish()
    }
}

fn sanitize_meta(meta: String) -> String {
    let mut meta = if meta.contains(['\r', '\n']) {
        meta.replace(['\r', '\n'], " ")
    } else {
        meta
    };
    if meta.len() > MAX_META_BYTES {
        let mut end = MAX_META_BYTES;
        while !meta.is_char_boundary(end) {
            end -= 1;
        }
        meta.truncate(end);
    }
    meta
}
