//! Static file tree handler.
//!
//! # Responsibilities
//! - Map `path_info` onto a root directory
//! - Serve `index.gmi` for directory requests
//! - Redirect directory paths lacking a trailing `/`
//!
//! # Design Decisions
//! - Any `..` left in `path_info` is refused, so requests never leave the root
//! - Missing or unreadable files answer `51`, never leaking the reason
//! - Mime type from the extension only

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;

use crate::protocol::{Handler, HandlerResult, Request, Response, Status};
use crate::uri::percent::{self, PATH};
use crate::uri::UriPath;

const INDEX_FILE: &str = "index.gmi";

/// Serves files below `root`.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location for `path_info`, or `None` if it would escape the
    /// root.
    fn locate(&self, path_info: &UriPath) -> Option<PathBuf> {
        let mut target = self.root.clone();
        for segment in path_info.segments() {
            if segment == ".." || segment.contains('\0') {
                return None;
            }
            target.push(segment);
        }
        Some(target)
    }
}

#[async_trait]
impl Handler for StaticFiles {
    async fn handle(&self, request: &Request<'_>, response: &mut Response<'_>) -> HandlerResult {
        let Some(mut target) = self.locate(request.path_info()) else {
            tracing::debug!(path_info = %request.path_info(), "Path escapes root");
            response.header(Status::NotFound, "Not found.");
            return Ok(());
        };

        let is_dir = match tokio::fs::metadata(&target).await {
            Ok(metadata) => metadata.is_dir(),
            Err(_) => {
                response.header(Status::NotFound, "Not found.");
                return Ok(());
            }
        };

        if is_dir {
            let path = request.uri().path();
            if !path.has_trailing_separator() {
                let location = format!("{}/", percent::encode(path.as_str(), &PATH));
                response.header(Status::RedirectPermanent, location);
                return Ok(());
            }
            target.push(INDEX_FILE);
        }

        let mut file = match File::open(&target).await {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(path = %target.display(), error = %e, "File not served");
                response.header(Status::NotFound, "Not found.");
                return Ok(());
            }
        };

        response.header(Status::Success, mime_type(&target));
        response.flush().await?;
        let sent = tokio::io::copy(&mut file, response.stream()).await?;
        tracing::debug!(path = %target.display(), bytes = sent, "File served");
        Ok(())
    }
}

/// Mime type for a file, by extension.
pub fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("gmi" | "gemini") => "text/gemini",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("xml") => "text/xml",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
