//! # czconnect-agent
//!
//! Credential-backed CONNECT proxy client for codezero spaces.
//!
//! The [`SpaceProxyAgent`] routes outbound connections through a space
//! proxy whose address, TLS trust anchor, and authorization token are not
//! static configuration: they are fetched just-in-time from the hub
//! control plane and cached until the token's embedded expiry comes
//! within a two-minute safety margin.
//!
//! The actual CONNECT handshake is performed by a [`TunnelConnector`],
//! the seam between credential management and transport. The crate ships
//! [`HttpConnectTunnel`] as the default transport; tests and embedders can
//! substitute their own.
//!
//! ## Example
//!
//! ```no_run
//! use czconnect_agent::SpaceProxyAgent;
//! use czconnect_common::{ConnectTarget, IdentityOptions};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let agent = SpaceProxyAgent::new(
//!     IdentityOptions::default()
//!         .with_org_id("org-1")
//!         .with_org_api_key("key-1")
//!         .with_space_id("staging"),
//! )?;
//!
//! let mut tunnel = agent.connect(&ConnectTarget::new("orders.svc", 80)).await?;
//! tunnel
//!     .write_all(b"GET / HTTP/1.1\r\nHost: orders.svc\r\nConnection: close\r\n\r\n")
//!     .await?;
//!
//! let mut response = String::new();
//! tunnel.read_to_string(&mut response).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use czconnect_common::{ConnectTarget, TunnelConfig};

pub mod agent;
pub mod connect;
pub mod error;
pub mod hub;

pub use agent::SpaceProxyAgent;
pub use connect::HttpConnectTunnel;
pub use error::{AgentError, TunnelError};
pub use hub::HubClient;

/// Byte stream flowing through an established tunnel.
pub trait TunnelIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> TunnelIo for T {}

impl std::fmt::Debug for dyn TunnelIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TunnelIo")
    }
}

/// An established tunnel to the target, ready for application bytes.
pub type TunnelStream = Box<dyn TunnelIo>;

/// Transport that performs the CONNECT handshake against a space proxy.
///
/// The agent resolves credentials, builds a fresh [`TunnelConfig`] per
/// call, and delegates here. Implementations must be thread-safe
/// (Send + Sync); a single agent is shared across concurrent connects.
#[async_trait]
pub trait TunnelConnector: Send + Sync {
    /// Establishes a tunnel to `target` through the proxy described by
    /// `tunnel`.
    ///
    /// # Errors
    ///
    /// Returns a [`TunnelError`] when the TCP connect, the TLS handshake
    /// with the proxy, or the CONNECT exchange fails. The agent propagates
    /// the failure to its caller unmodified.
    async fn connect(
        &self,
        target: &ConnectTarget,
        tunnel: &TunnelConfig,
    ) -> Result<TunnelStream, TunnelError>;
}
