//! Default tunnel transport: TLS to the space proxy, then an HTTP CONNECT
//! handshake.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use czconnect_common::{ConnectTarget, TunnelConfig};

use crate::error::TunnelError;
use crate::{TunnelConnector, TunnelStream};

/// Longest CONNECT response head the transport will buffer.
const MAX_RESPONSE_HEAD: usize = 8 * 1024;

/// CONNECT-over-TLS transport.
///
/// Dials the space proxy over TCP, upgrades to TLS trusting only the CA
/// delivered with the credentials, then asks the proxy for a raw channel
/// to the target with an HTTP CONNECT carrying the `Proxy-Authorization`
/// token.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnectTunnel;

impl HttpConnectTunnel {
    /// Creates the default transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TunnelConnector for HttpConnectTunnel {
    async fn connect(
        &self,
        target: &ConnectTarget,
        tunnel: &TunnelConfig,
    ) -> Result<TunnelStream, TunnelError> {
        let tcp = TcpStream::connect((tunnel.proxy_host.as_str(), tunnel.proxy_port)).await?;
        tcp.set_nodelay(true)?;

        let tls = TlsConnector::from(Arc::new(client_config(&tunnel.ca_cert)?));
        let server_name = ServerName::try_from(tunnel.server_name.clone())?;
        let mut stream = tls.connect(server_name, tcp).await?;

        debug!(
            "issuing CONNECT {target} via {}:{}",
            tunnel.proxy_host, tunnel.proxy_port
        );
        stream
            .write_all(connect_request(target, &tunnel.proxy_authorization).as_bytes())
            .await?;
        stream.flush().await?;
        read_connect_response(&mut stream).await?;

        Ok(Box::new(stream))
    }
}

/// TLS client configuration trusting only the proxy's CA bundle.
fn client_config(ca_pem: &str) -> Result<ClientConfig, TunnelError> {
    let mut roots = RootCertStore::empty();
    for cert in CertificateDer::pem_slice_iter(ca_pem.as_bytes()) {
        let cert = cert.map_err(|e| TunnelError::InvalidCaCertificate(e.to_string()))?;
        roots.add(cert)?;
    }
    if roots.is_empty() {
        return Err(TunnelError::InvalidCaCertificate(
            "no certificates in PEM bundle".to_string(),
        ));
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// Serializes the CONNECT request head.
///
/// The authorization value is the raw space token, no `Bearer` prefix.
fn connect_request(target: &ConnectTarget, authorization: &SecretString) -> String {
    format!(
        "CONNECT {target} HTTP/1.1\r\nHost: {target}\r\nProxy-Authorization: {}\r\n\r\n",
        authorization.expose_secret()
    )
}

/// Reads the proxy's response head and fails unless it accepted the
/// CONNECT.
///
/// Reads one byte at a time so no tunnel payload past the head is ever
/// consumed from the stream.
async fn read_connect_response<S>(stream: &mut S) -> Result<(), TunnelError>
where
    S: AsyncRead + Unpin,
{
    let mut head: Vec<u8> = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(TunnelError::MalformedResponse(
                "response head too large".to_string(),
            ));
        }
        if stream.read(&mut byte).await? == 0 {
            return Err(TunnelError::MalformedResponse(
                "connection closed during CONNECT handshake".to_string(),
            ));
        }
        head.push(byte[0]);
    }

    parse_connect_status(&head)
}

/// Parses the status line of a CONNECT response head; anything but a 2xx
/// status is a rejected handshake.
fn parse_connect_status(head: &[u8]) -> Result<(), TunnelError> {
    let text = std::str::from_utf8(head)
        .map_err(|_| TunnelError::MalformedResponse("non-UTF-8 response head".to_string()))?;
    let status_line = text.lines().next().unwrap_or_default();

    let mut parts = status_line.split_whitespace();
    let version = parts.next();
    let status = parts.next().and_then(|s| s.parse::<u16>().ok());

    match (version, status) {
        (Some(version), Some(status)) if version.starts_with("HTTP/") => {
            if (200..300).contains(&status) {
                Ok(())
            } else {
                Err(TunnelError::HandshakeRejected {
                    status,
                    reason: parts.collect::<Vec<_>>().join(" "),
                })
            }
        }
        _ => Err(TunnelError::MalformedResponse(format!(
            "invalid status line: {status_line}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use tokio::io::AsyncWriteExt as _;

    use super::*;

    #[test]
    fn connect_request_carries_the_raw_token() {
        let request = connect_request(
            &ConnectTarget::new("svc.internal", 443),
            &SecretString::from("tok-123".to_string()),
        );

        assert!(request.starts_with("CONNECT svc.internal:443 HTTP/1.1\r\n"));
        assert!(request.contains("Host: svc.internal:443\r\n"));
        assert!(request.contains("Proxy-Authorization: tok-123\r\n"));
        assert!(!request.contains("Bearer"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn accepted_connect_parses_as_success() {
        assert!(parse_connect_status(b"HTTP/1.1 200 Connection Established\r\n\r\n").is_ok());
        assert!(parse_connect_status(b"HTTP/1.0 200 OK\r\n\r\n").is_ok());
    }

    #[test]
    fn rejected_connect_carries_status_and_reason() {
        let err = parse_connect_status(b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n")
            .unwrap_err();

        match err {
            TunnelError::HandshakeRejected { status, reason } => {
                assert_eq!(status, 407);
                assert_eq!(reason, "Proxy Authentication Required");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_response_is_malformed() {
        assert!(matches!(
            parse_connect_status(b"SSH-2.0-OpenSSH\r\n\r\n"),
            Err(TunnelError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn response_reader_stops_at_the_head_boundary() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server
            .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\ntunnel-bytes")
            .await
            .unwrap();

        read_connect_response(&mut client).await.unwrap();

        // The first tunnel payload byte is still unread.
        let mut first = [0u8; 1];
        client.read_exact(&mut first).await.unwrap();
        assert_eq!(&first, b"t");
    }

    #[tokio::test]
    async fn truncated_response_is_malformed() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(b"HTTP/1.1 200").await.unwrap();
        drop(server);

        assert!(matches!(
            read_connect_response(&mut client).await,
            Err(TunnelError::MalformedResponse(_))
        ));
    }

    #[test]
    fn empty_ca_bundle_is_rejected() {
        assert!(matches!(
            client_config(""),
            Err(TunnelError::InvalidCaCertificate(_))
        ));
    }
}
