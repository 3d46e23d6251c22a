//! # czconnect-common
//!
//! Shared types for the czconnect proxy client: agent identity
//! configuration, hub-issued space credentials, and the per-connection
//! tunnel parameters handed to a tunnel connector.
//!
//! ## Example
//!
//! ```
//! use czconnect_common::IdentityOptions;
//!
//! let identity = IdentityOptions::default()
//!     .with_org_id("org-1")
//!     .with_org_api_key("key-1")
//!     .with_space_id("staging")
//!     .resolve()?;
//!
//! assert_eq!(identity.space_id, "staging");
//! # Ok::<(), czconnect_common::ConfigError>(())
//! ```

/// Identity configuration and environment resolution.
///
/// Provides the options struct callers fill in and the immutable identity
/// produced by resolving it against environment defaults.
pub mod config;
/// Hub-issued space credentials and token expiry checks.
pub mod credentials;
/// Tunnel parameter types consumed by tunnel connectors.
pub mod tunnel;

pub use config::{ConfigError, DEFAULT_HUB_BASE_URL, Identity, IdentityOptions, RetryConfig};
pub use credentials::{SpaceCredentials, TOKEN_EXPIRY_MARGIN_SECS, is_token_expired, token_expiry};
pub use tunnel::{ConnectTarget, SPACE_PROXY_PORT, SPACES_DOMAIN, TunnelConfig};
