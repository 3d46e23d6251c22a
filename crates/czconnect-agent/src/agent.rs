//! The credential-backed proxy agent.

use std::sync::Arc;

use log::debug;
use tokio::sync::Mutex;

use czconnect_common::{
    ConnectTarget, Identity, IdentityOptions, RetryConfig, SpaceCredentials, TunnelConfig,
};

use crate::connect::HttpConnectTunnel;
use crate::error::AgentError;
use crate::hub::HubClient;
use crate::{TunnelConnector, TunnelStream};

/// CONNECT proxy client whose proxy endpoint, trust anchor, and
/// authorization are resolved just-in-time from the hub.
///
/// Credentials are cached on the agent and re-validated against their
/// embedded expiry at the start of every [`connect`] call; a stale or
/// absent cache triggers a fetch before the tunnel is opened. The cache
/// is replaced wholesale on every successful fetch and left untouched
/// when a fetch fails, so a still-valid credential survives a transient
/// hub outage.
///
/// One agent instance is meant to be shared across many sequential or
/// concurrent connections to the same space.
///
/// [`connect`]: SpaceProxyAgent::connect
pub struct SpaceProxyAgent {
    identity: Identity,
    hub: HubClient,
    connector: Arc<dyn TunnelConnector>,
    credentials: Mutex<Option<SpaceCredentials>>,
}

impl SpaceProxyAgent {
    /// Creates an agent using the default CONNECT-over-TLS transport.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a required identity field is
    /// absent from both `options` and the environment, or when the
    /// resolved hub URL is invalid.
    pub fn new(options: IdentityOptions) -> Result<Self, AgentError> {
        Self::with_connector(options, Arc::new(HttpConnectTunnel::new()))
    }

    /// Creates an agent that delegates tunnel establishment to
    /// `connector`.
    ///
    /// This is the override point: the agent composes its transport
    /// rather than extending one, so any [`TunnelConnector`] can stand in
    /// for the default.
    ///
    /// # Errors
    ///
    /// Same conditions as [`SpaceProxyAgent::new`].
    pub fn with_connector(
        options: IdentityOptions,
        connector: Arc<dyn TunnelConnector>,
    ) -> Result<Self, AgentError> {
        let identity = options.resolve()?;
        let hub = HubClient::new(&identity.hub_base_url, &RetryConfig::default())?;

        Ok(Self {
            identity,
            hub,
            connector,
            credentials: Mutex::new(None),
        })
    }

    /// The resolved identity this agent runs as.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Opens a tunnel to `target` through the space proxy.
    ///
    /// Ensures valid credentials (fetching from the hub when the cache is
    /// empty or expired), builds a fresh [`TunnelConfig`] for this call,
    /// and delegates the handshake to the connector. Both the fetch and
    /// the delegated connect may suspend; failures from either propagate
    /// unchanged.
    ///
    /// # Errors
    ///
    /// [`AgentError::CredentialFetch`] when the hub rejects the request,
    /// [`AgentError::Tunnel`] when the transport fails, and network or
    /// serialization errors from the fetch itself.
    pub async fn connect(&self, target: &ConnectTarget) -> Result<TunnelStream, AgentError> {
        let credentials = self.space_credentials().await?;
        let tunnel = TunnelConfig::for_space(&self.identity.space_id, &credentials);

        debug!(
            "tunneling to {target} via space proxy {}:{}",
            tunnel.proxy_host, tunnel.proxy_port
        );
        Ok(self.connector.connect(target, &tunnel).await?)
    }

    /// Returns cached credentials while they are fresh, fetching from the
    /// hub otherwise.
    ///
    /// The lock is held across the fetch, so concurrent connects trigger
    /// at most one request and never observe a half-written cache entry.
    async fn space_credentials(&self) -> Result<SpaceCredentials, AgentError> {
        let mut cached = self.credentials.lock().await;

        if let Some(credentials) = cached.as_ref() {
            if credentials.is_expired() {
                debug!("cached space credentials expired; refetching");
            } else {
                return Ok(credentials.clone());
            }
        }

        let fresh = self.hub.get_space_connection(&self.identity).await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}
