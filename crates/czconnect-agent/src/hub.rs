//! HTTP client for the hub's credential-issuing endpoint.

use std::time::Duration;

use log::{debug, error, warn};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_retry_after::RetryAfterMiddleware;
use secrecy::ExposeSecret;
use serde::Deserialize;

use czconnect_common::{Identity, RetryConfig, SpaceCredentials};

use crate::error::AgentError;

/// RPC path of the space-connection endpoint.
pub const GET_SPACE_CONNECTION_PATH: &str =
    "/api/c6o/connect/c6oapi.v1.C6OService/GetSpaceConnection";

/// Request timeout for hub calls.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Error payload the hub returns on failure.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Client for the hub control plane.
///
/// Connection keep-alive comes from reqwest's default pooling, so
/// repeated credential fetches reuse the hub connection. Transient
/// network failures are retried with exponential backoff; a hub response
/// with a non-success status is surfaced immediately and never retried at
/// this layer.
#[derive(Clone, Debug)]
pub struct HubClient {
    client: ClientWithMiddleware,
    endpoint: url::Url,
}

impl HubClient {
    /// Creates a client for the hub at `hub_base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidHubUrl`] when the base URL and the
    /// endpoint path do not form a valid URL, and a network error when the
    /// underlying HTTP client cannot be constructed.
    pub fn new(hub_base_url: &str, retry: &RetryConfig) -> Result<Self, AgentError> {
        let endpoint = format!(
            "{}{GET_SPACE_CONNECTION_PATH}",
            hub_base_url.trim_end_matches('/')
        );
        let endpoint = url::Url::parse(&endpoint)
            .map_err(|e| AgentError::InvalidHubUrl(format!("{endpoint}: {e}")))?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(retry.initial_delay, retry.max_delay)
            .build_with_max_retries(retry.max_retries);

        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

        // RetryAfterMiddleware before RetryTransientMiddleware so Retry-After
        // headers are respected before falling back to exponential backoff.
        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(RetryAfterMiddleware::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, endpoint })
    }

    /// Fetches fresh space connection credentials for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::CredentialFetch`] carrying the hub's message
    /// when the response status indicates failure, and network,
    /// middleware, or serialization errors for transport-level problems.
    pub async fn get_space_connection(
        &self,
        identity: &Identity,
    ) -> Result<SpaceCredentials, AgentError> {
        debug!("fetching space connection for {}", identity.space_id);

        let body = serde_json::json!({ "spaceId": identity.space_id });
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(
                "Authorization",
                format!(
                    "{}:{}",
                    identity.org_id,
                    identity.org_api_key.expose_secret()
                ),
            )
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(&body)?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.map_err(|e| {
                warn!("failed to read hub error response body: {e}");
                AgentError::Network(e)
            })?;

            // The hub reports failures as {"message": ...}; fall back to the
            // raw body when it sends something else.
            let message = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(parsed) => parsed.message,
                Err(_) => error_text,
            };

            error!(
                "hub rejected GetSpaceConnection with status {}: {message}",
                status.as_u16()
            );
            return Err(AgentError::CredentialFetch(message));
        }

        let credentials: SpaceCredentials = serde_json::from_str(&response.text().await?)?;
        debug!(
            "received space connection credentials for proxy {}",
            credentials.host
        );
        Ok(credentials)
    }
}
