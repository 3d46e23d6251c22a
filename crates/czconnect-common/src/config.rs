//! Agent identity configuration.
//!
//! Callers fill in an [`IdentityOptions`] with whatever they know and call
//! [`IdentityOptions::resolve`]; each missing field falls back to its
//! environment variable, and the result is a fully-resolved immutable
//! [`Identity`]. Resolution happens exactly once; the environment is never
//! re-read after construction.

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Environment fallback for the organization id.
pub const ENV_ORG_ID: &str = "CZ_ORG_ID";
/// Environment fallback for the organization API key.
pub const ENV_ORG_API_KEY: &str = "CZ_ORG_API_KEY";
/// Environment fallback for the space id.
pub const ENV_SPACE_ID: &str = "CZ_SPACE_ID";
/// Environment fallback for the hub base URL.
pub const ENV_HUB_SERVER_BASE_URL: &str = "CZ_HUB_SERVER_BASE_URL";

/// Production hub endpoint used when no override is supplied.
pub const DEFAULT_HUB_BASE_URL: &str = "https://hub.codezero.io";

/// Errors raised while resolving an agent identity.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required identity field was neither passed explicitly nor present
    /// in the environment. Fatal; the caller must supply it.
    #[error("missing {name}: pass it explicitly or set {env}")]
    MissingField {
        /// Human-readable field name.
        name: &'static str,
        /// Environment variable consulted as the fallback.
        env: &'static str,
    },
}

/// Partial identity supplied by the caller.
///
/// Every field is optional; unset fields are resolved from the environment.
/// Empty strings count as unset, so an empty `CZ_ORG_ID` in a CI job does
/// not masquerade as a real organization id.
#[derive(Debug, Clone, Default)]
pub struct IdentityOptions {
    /// Organization id, or `None` to read `CZ_ORG_ID`.
    pub org_id: Option<String>,
    /// Organization API key, or `None` to read `CZ_ORG_API_KEY`.
    pub org_api_key: Option<String>,
    /// Space id, or `None` to read `CZ_SPACE_ID`.
    pub space_id: Option<String>,
    /// Hub base URL, or `None` to read `CZ_HUB_SERVER_BASE_URL` and fall
    /// back to the production endpoint.
    pub hub_base_url: Option<String>,
}

impl IdentityOptions {
    /// Sets the organization id.
    #[must_use]
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Sets the organization API key.
    #[must_use]
    pub fn with_org_api_key(mut self, org_api_key: impl Into<String>) -> Self {
        self.org_api_key = Some(org_api_key.into());
        self
    }

    /// Sets the space id.
    #[must_use]
    pub fn with_space_id(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = Some(space_id.into());
        self
    }

    /// Sets the hub base URL, overriding the production endpoint.
    #[must_use]
    pub fn with_hub_base_url(mut self, hub_base_url: impl Into<String>) -> Self {
        self.hub_base_url = Some(hub_base_url.into());
        self
    }

    /// Resolves these options into an immutable [`Identity`], falling back
    /// to the `CZ_*` environment variables for unset fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the organization id, the
    /// organization API key, or the space id is absent from both the
    /// options and the environment.
    pub fn resolve(self) -> Result<Identity, ConfigError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolution against an arbitrary variable lookup, so the fallback
    /// path is testable without touching process environment.
    fn resolve_with(self, lookup: impl Fn(&str) -> Option<String>) -> Result<Identity, ConfigError> {
        let org_id = require(self.org_id, &lookup, ENV_ORG_ID, "organization id")?;
        let org_api_key = require(
            self.org_api_key,
            &lookup,
            ENV_ORG_API_KEY,
            "organization API key",
        )?;
        let space_id = require(self.space_id, &lookup, ENV_SPACE_ID, "space id")?;

        let hub_base_url = non_empty(self.hub_base_url)
            .or_else(|| non_empty(lookup(ENV_HUB_SERVER_BASE_URL)))
            .unwrap_or_else(|| DEFAULT_HUB_BASE_URL.to_string());

        Ok(Identity {
            org_id,
            org_api_key: org_api_key.into(),
            space_id,
            hub_base_url,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn require(
    explicit: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
    env: &'static str,
    name: &'static str,
) -> Result<String, ConfigError> {
    non_empty(explicit)
        .or_else(|| non_empty(lookup(env)))
        .ok_or(ConfigError::MissingField { name, env })
}

/// Fully-resolved agent identity.
///
/// Immutable for the lifetime of the agent that owns it. The API key is
/// held as a [`SecretString`] and never appears in `Debug` output.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Organization id.
    pub org_id: String,
    /// Organization API key.
    pub org_api_key: SecretString,
    /// Space id; also names the TLS server the space proxy presents.
    pub space_id: String,
    /// Base URL of the credential-issuing hub.
    pub hub_base_url: String,
}

/// Retry tuning for transient hub request failures.
///
/// Only network-level failures are retried; a hub response with a
/// non-success status is surfaced immediately.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts before failing.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the exponential backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn full_options() -> IdentityOptions {
        IdentityOptions::default()
            .with_org_id("org-123")
            .with_org_api_key("key-456")
            .with_space_id("staging")
    }

    #[test]
    fn resolves_explicit_options() {
        let identity = full_options().resolve_with(no_env).unwrap();
        assert_eq!(identity.org_id, "org-123");
        assert_eq!(identity.space_id, "staging");
        assert_eq!(identity.hub_base_url, DEFAULT_HUB_BASE_URL);
    }

    #[test]
    fn each_identity_field_is_required() {
        let cases = [
            (
                IdentityOptions {
                    org_id: None,
                    ..full_options()
                },
                ENV_ORG_ID,
            ),
            (
                IdentityOptions {
                    org_api_key: None,
                    ..full_options()
                },
                ENV_ORG_API_KEY,
            ),
            (
                IdentityOptions {
                    space_id: None,
                    ..full_options()
                },
                ENV_SPACE_ID,
            ),
        ];

        for (options, env) in cases {
            let err = options.resolve_with(no_env).unwrap_err();
            let ConfigError::MissingField { env: missing, .. } = err;
            assert_eq!(missing, env);
        }
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let err = full_options()
            .with_org_id("")
            .resolve_with(no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { env, .. } if env == ENV_ORG_ID));
    }

    #[test]
    fn environment_fills_missing_fields() {
        let identity = IdentityOptions::default()
            .with_space_id("dev")
            .resolve_with(|name| match name {
                ENV_ORG_ID => Some("env-org".to_string()),
                ENV_ORG_API_KEY => Some("env-key".to_string()),
                ENV_HUB_SERVER_BASE_URL => Some("https://hub.internal".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(identity.org_id, "env-org");
        assert_eq!(identity.space_id, "dev");
        assert_eq!(identity.hub_base_url, "https://hub.internal");
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let identity = full_options()
            .with_hub_base_url("https://hub.example")
            .resolve_with(|_| Some("from-env".to_string()))
            .unwrap();

        assert_eq!(identity.org_id, "org-123");
        assert_eq!(identity.hub_base_url, "https://hub.example");
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let identity = full_options().resolve_with(no_env).unwrap();
        let rendered = format!("{identity:?}");
        assert!(!rendered.contains("key-456"));
    }
}
