//! Tunnel parameters handed to a tunnel connector for each connection.

use std::fmt;

use secrecy::SecretString;

use crate::credentials::SpaceCredentials;

/// Port every space proxy listens on.
pub const SPACE_PROXY_PORT: u16 = 8800;

/// DNS domain under which space proxy certificates are issued.
pub const SPACES_DOMAIN: &str = "spaces.codezero.io";

/// Final destination of a proxied connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    /// Destination hostname or address.
    pub host: String,
    /// Destination port.
    pub port: u16,
}

impl ConnectTarget {
    /// Creates a target from a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Per-connection tunnel parameters.
///
/// Built fresh for every connect call from the agent identity and the
/// currently cached credentials; connectors must not assume two calls
/// share state.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// Network address of the space proxy.
    pub proxy_host: String,
    /// Port of the space proxy.
    pub proxy_port: u16,
    /// Server name presented during the TLS handshake with the proxy.
    pub server_name: String,
    /// PEM certificate trusted as the proxy's CA.
    pub ca_cert: String,
    /// Raw token sent as the `Proxy-Authorization` header value.
    pub proxy_authorization: SecretString,
}

impl TunnelConfig {
    /// Tunnel parameters for `space_id`, backed by `credentials`.
    #[must_use]
    pub fn for_space(space_id: &str, credentials: &SpaceCredentials) -> Self {
        Self {
            proxy_host: credentials.host.clone(),
            proxy_port: SPACE_PROXY_PORT,
            server_name: format!("{space_id}.{SPACES_DOMAIN}"),
            ca_cert: credentials.cert.clone(),
            proxy_authorization: credentials.token.clone(),
        }
    }
}
