//! End-to-end: a stubbed hub issues credentials, and a request through the
//! agent reaches a stub target service behind a pass-through transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use czconnect_agent::{SpaceProxyAgent, TunnelConnector, TunnelError, TunnelStream};
use czconnect_common::{ConnectTarget, IdentityOptions, TunnelConfig};

/// Stands in for the CONNECT transport: checks the credential-derived
/// parameters it was handed, then dials the target directly.
struct PassThroughConnector;

#[async_trait]
impl TunnelConnector for PassThroughConnector {
    async fn connect(
        &self,
        target: &ConnectTarget,
        tunnel: &TunnelConfig,
    ) -> Result<TunnelStream, TunnelError> {
        assert_eq!(tunnel.proxy_host, "127.0.0.1");
        assert_eq!(tunnel.proxy_port, 8800);
        assert_eq!(tunnel.server_name, "spaceId.spaces.codezero.io");

        let stream = tokio::net::TcpStream::connect((target.host.as_str(), target.port)).await?;
        Ok(Box::new(stream))
    }
}

fn token_valid_for(seconds: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + seconds;
    let claims = serde_json::json!({ "exp": exp }).to_string();
    format!("header.{}.signature", URL_SAFE_NO_PAD.encode(claims))
}

/// One-shot HTTP server that answers any request with `Hello!`.
async fn spawn_target_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let read = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..read]);
            if read == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\nHello!")
            .await
            .unwrap();
    });

    (addr, handle)
}

#[tokio::test]
async fn request_through_the_agent_reaches_the_target() {
    let hub = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/c6o/connect/c6oapi.v1.C6OService/GetSpaceConnection"))
        .and(header("Authorization", "org-123:key-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "host": "127.0.0.1",
            "token": token_valid_for(180),
            "cert": "C",
        })))
        .expect(1)
        .mount(&hub)
        .await;

    let (target_addr, target_server) = spawn_target_server().await;

    let agent = SpaceProxyAgent::with_connector(
        IdentityOptions::default()
            .with_org_id("org-123")
            .with_org_api_key("key-456")
            .with_space_id("spaceId")
            .with_hub_base_url(hub.uri()),
        Arc::new(PassThroughConnector),
    )
    .unwrap();

    let target = ConnectTarget::new("127.0.0.1", target_addr.port());
    let mut tunnel = agent.connect(&target).await.unwrap();

    tunnel
        .write_all(b"GET / HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    tunnel.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("Hello!"));
    target_server.await.unwrap();
}
