//! Error types for the agent.

use thiserror::Error;

use czconnect_common::ConfigError;

/// Errors that can occur while resolving credentials or opening tunnels.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// Required identity fields were missing at construction.
    ///
    /// Fatal; the caller must supply complete configuration.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The hub base URL could not be parsed.
    #[error("invalid hub URL: {0}")]
    InvalidHubUrl(String),

    /// The hub answered the credential request with a non-success status.
    ///
    /// Carries the service-provided message. Never retried internally; the
    /// next connection attempt fetches from scratch.
    #[error("credential fetch failed: {0}")]
    CredentialFetch(String),

    /// Network or HTTP failure talking to the hub.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Middleware layer failure (retry plumbing).
    #[error("middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// The hub payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The tunnel transport failed during CONNECT or TLS negotiation.
    ///
    /// Propagated unmodified from the [`TunnelConnector`].
    ///
    /// [`TunnelConnector`]: crate::TunnelConnector
    #[error("tunnel error: {0}")]
    Tunnel(#[from] TunnelError),
}

impl AgentError {
    /// Whether this is a construction-time configuration failure.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::InvalidHubUrl(_))
    }

    /// Whether the hub rejected the credential request.
    #[must_use]
    pub const fn is_credential_fetch(&self) -> bool {
        matches!(self, Self::CredentialFetch(_))
    }

    /// Whether a later connection attempt could plausibly succeed without
    /// configuration changes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Middleware(_) | Self::Tunnel(_)
        )
    }
}

/// Errors from the CONNECT tunnel transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TunnelError {
    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS negotiation with the proxy failed.
    #[error("TLS error: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    /// The configured TLS server name is not a valid DNS name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(#[from] tokio_rustls::rustls::pki_types::InvalidDnsNameError),

    /// The credential's CA certificate could not be used as a trust
    /// anchor.
    #[error("invalid proxy CA certificate: {0}")]
    InvalidCaCertificate(String),

    /// The proxy answered the CONNECT request with a non-success status.
    #[error("proxy rejected CONNECT: {status} {reason}")]
    HandshakeRejected {
        /// HTTP status code from the proxy.
        status: u16,
        /// Reason phrase, possibly empty.
        reason: String,
    },

    /// The proxy's response could not be parsed as an HTTP response head.
    #[error("malformed proxy response: {0}")]
    MalformedResponse(String),
}
