//! Shared utilities for integration tests: a TLS server on an ephemeral port
//! and a client that trusts any certificate.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use gemserve::config::ServerConfig;
use gemserve::net::{ConnectionRegistry, Server, ServerError};
use gemserve::{Router, Shutdown};

/// A running server and the handles tests need to poke at it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub registry: ConnectionRegistry,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

/// Self-signed certificate for `localhost`.
pub fn server_tls() -> Arc<rustls::ServerConfig> {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_der = CertificateDer::from(cert.serialize_der().unwrap());
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()));
    gemserve::net::tls::server_config(vec![cert_der], key_der).unwrap()
}

/// Start a server for `router` on 127.0.0.1 with the given deadline.
pub async fn spawn_server(router: Router, deadline: Duration) -> TestServer {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();

    let server = Server::bind(&config, server_tls(), router)
        .await
        .unwrap()
        .with_deadline(deadline);
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let registry = server.registry();
    let handle = tokio::spawn(server.run());

    TestServer {
        addr,
        shutdown,
        registry,
        handle,
    }
}

/// Gemini clients trust on first use, so the tests accept any certificate.
#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

fn client_config() -> Arc<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .unwrap()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(provider)))
        .with_no_client_auth();
    Arc::new(config)
}

/// Open a TLS connection, sending `localhost` as SNI.
pub async fn connect(addr: SocketAddr) -> TlsStream<TcpStream> {
    let tcp = TcpStream::connect(addr).await.unwrap();
    TlsConnector::from(client_config())
        .connect(ServerName::try_from("localhost").unwrap(), tcp)
        .await
        .unwrap()
}

/// Read until the server closes. A close without `close_notify` reads as an
/// error.
pub async fn read_response(stream: &mut TlsStream<TcpStream>) -> std::io::Result<String> {
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Send one raw request and return the full response.
pub async fn request(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = connect(addr).await;
    stream.write_all(raw).await.unwrap();
    stream.flush().await.unwrap();
    read_response(&mut stream).await.unwrap()
}

/// Poll until `condition` holds or a second passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
