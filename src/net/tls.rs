//! TLS configuration, certificate loading and session introspection.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;

/// Error type for TLS setup.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),
    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),
    #[error("invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Load a server TLS configuration from PEM certificate and key files.
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<Arc<rustls::ServerConfig>, TlsError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| TlsError::Io { path, source }
    };

    let mut cert_reader = BufReader::new(File::open(cert_path).map_err(io_error(cert_path))?);
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error(cert_path))?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
    }

    let mut key_reader = BufReader::new(File::open(key_path).map_err(io_error(key_path))?);
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(io_error(key_path))?
        .ok_or_else(|| TlsError::NoPrivateKey(key_path.to_path_buf()))?;

    let config = server_config(certs, key)?;
    tracing::info!(cert_path = %cert_path.display(), "TLS certificate loaded");
    Ok(config)
}

/// Build a server TLS configuration from DER material.
///
/// Client certificates are not requested.
pub fn server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<Arc<rustls::ServerConfig>, TlsError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    Ok(Arc::new(config))
}

/// Read-only queries against an established TLS session.
pub trait TlsIntrospect {
    /// Server name the client sent in the SNI extension.
    fn sni_server_name(&self) -> Option<&str>;

    /// Server name recorded in the ticket data of a resumed session.
    fn resumed_server_name(&self) -> Option<&str>;
}

impl TlsIntrospect for rustls::ServerConnection {
    fn sni_server_name(&self) -> Option<&str> {
        self.server_name()
    }

    fn resumed_server_name(&self) -> Option<&str> {
        self.received_resumption_data()
            .and_then(|data| std::str::from_utf8(data).ok())
            .filter(|name| !name.is_empty())
    }
}

/// What the connection keeps from the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsDetails {
    pub server_name: Option<String>,
}

impl TlsDetails {
    /// SNI first, then the resumed session's name.
    pub fn from_session(session: &impl TlsIntrospect) -> Self {
        Self {
            server_name: session
                .sni_server_name()
                .or_else(|| session.resumed_server_name())
                .map(str::to_owned),
        }
    }
}
