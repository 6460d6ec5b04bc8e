//! Engine configuration.
//!
//! [`SolanaCoreConfig`] is resolved exactly once, typically at process start
//! via [`SolanaCoreConfig::from_env`], and then shared by reference with every
//! component that needs endpoints, commitments, fee bounds or service URLs.
//!
//! # Environment Variables
//!
//! - `SOLANA_RPC_PRIMARY` / `SOLANA_RPC_URL` / `NEXT_PUBLIC_SOLANA_RPC_URL` /
//!   `PUBLIC_SOLANA_RPC_URL` - primary endpoint (first non-empty wins)
//! - `SOLANA_RPC_FALLBACKS` / `SOLANA_RPC_URLS` - comma-separated fallbacks
//! - `SOLANA_COMMITMENT_READ` / `SOLANA_COMMITMENT_SEND` - per-purpose commitment
//! - `SOLANA_PRIORITY_FEE_MIN_MICROLAMPORTS` / `SOLANA_PRIORITY_FEE_MAX_MICROLAMPORTS`
//! - `FARTNODE_ACTION_IDENTITY_MEMO` / `FARTNODE_ACTION_IDENTITY_PUBKEY`
//! - `JUPITER_BASE_URL`
//! - `FARTNODE_JITO_URL` / `JITO_BUNDLE_URL`, `FARTNODE_JITO_ENABLED`

use std::time::Duration;

use url::Url;

use crate::commitment::{Commitment, RpcPurpose, UnknownCommitment};
use crate::endpoint::{EndpointList, parse_endpoint_list};

/// Default base URL of the Jupiter swap API.
pub const DEFAULT_JUPITER_BASE_URL: &str = "https://quote-api.jup.ag";

/// Default time an endpoint stays trusted after a successful liveness probe.
pub const DEFAULT_HEALTH_TTL: Duration = Duration::from_secs(45);

/// Default per-request RPC timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

const PRIMARY_KEYS: [&str; 4] = [
    "SOLANA_RPC_PRIMARY",
    "SOLANA_RPC_URL",
    "NEXT_PUBLIC_SOLANA_RPC_URL",
    "PUBLIC_SOLANA_RPC_URL",
];
const FALLBACK_KEYS: [&str; 2] = ["SOLANA_RPC_FALLBACKS", "SOLANA_RPC_URLS"];
const IDENTITY_KEYS: [&str; 2] = [
    "FARTNODE_ACTION_IDENTITY_MEMO",
    "FARTNODE_ACTION_IDENTITY_PUBKEY",
];
const JITO_URL_KEYS: [&str; 2] = ["FARTNODE_JITO_URL", "JITO_BUNDLE_URL"];

/// Errors raised while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A commitment variable holds an unknown level.
    #[error("{key}: {source}")]
    InvalidCommitment {
        /// Variable name.
        key: &'static str,
        /// Parse failure.
        source: UnknownCommitment,
    },

    /// A numeric variable is not an unsigned integer.
    #[error("{key}: expected an unsigned integer, got {value:?}")]
    InvalidInteger {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// A URL variable cannot be parsed.
    #[error("{key}: invalid URL {value:?}: {source}")]
    InvalidUrl {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        source: url::ParseError,
    },
}

/// Immutable configuration shared by the selector, fee estimator, blockhash
/// service and third-party clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolanaCoreConfig {
    /// Prioritized RPC endpoints.
    pub endpoints: EndpointList,
    /// Default commitment for reads.
    pub read_commitment: Commitment,
    /// Default commitment for submission and confirmation.
    pub send_commitment: Commitment,
    /// Lower fee bound from the environment, in microlamports per CU.
    pub priority_fee_min: Option<u64>,
    /// Upper fee bound from the environment, in microlamports per CU.
    pub priority_fee_max: Option<u64>,
    /// Identity memo payload, without the `fartnode.identity:` prefix.
    pub identity_memo: Option<String>,
    /// Jupiter API base URL.
    pub jupiter_base_url: Url,
    /// Jito bundle relay URL.
    pub jito_url: Option<Url>,
    /// Whether bundles should be sent through the relay at all.
    pub jito_enabled: bool,
    /// Time an endpoint stays trusted after a successful probe.
    pub health_ttl: Duration,
    /// Per-request RPC timeout.
    pub rpc_timeout: Duration,
}

impl Default for SolanaCoreConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointList::default(),
            read_commitment: Commitment::Confirmed,
            send_commitment: Commitment::Confirmed,
            priority_fee_min: None,
            priority_fee_max: None,
            identity_memo: None,
            jupiter_base_url: default_jupiter_url(),
            jito_url: None,
            jito_enabled: false,
            health_ttl: DEFAULT_HEALTH_TTL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

fn default_jupiter_url() -> Url {
    Url::parse(DEFAULT_JUPITER_BASE_URL).expect("valid default Jupiter URL")
}

impl SolanaCoreConfig {
    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparseable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let first = |keys: &[&'static str]| keys.iter().find_map(|k| get(k).map(|v| (*k, v)));

        let primary = first(&PRIMARY_KEYS).map(|(_, v)| v);
        let fallbacks = first(&FALLBACK_KEYS)
            .map(|(_, v)| parse_endpoint_list(&v))
            .unwrap_or_default();
        let endpoints = EndpointList::new(primary.as_deref(), fallbacks);

        let commitment = |key: &'static str| -> Result<Option<Commitment>, ConfigError> {
            get(key)
                .map(|v| {
                    v.parse()
                        .map_err(|source| ConfigError::InvalidCommitment { key, source })
                })
                .transpose()
        };
        let integer = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            get(key)
                .map(|value| {
                    value
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidInteger { key, value })
                })
                .transpose()
        };
        let url = |key: &'static str, value: String| -> Result<Url, ConfigError> {
            Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { key, value, source })
        };

        let jupiter_base_url = match get("JUPITER_BASE_URL") {
            Some(value) => url("JUPITER_BASE_URL", value)?,
            None => default_jupiter_url(),
        };
        let jito_url = first(&JITO_URL_KEYS)
            .map(|(key, value)| url(key, value))
            .transpose()?;
        let jito_enabled = get("FARTNODE_JITO_ENABLED")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        let config = Self {
            endpoints,
            read_commitment: commitment("SOLANA_COMMITMENT_READ")?.unwrap_or(Commitment::Confirmed),
            send_commitment: commitment("SOLANA_COMMITMENT_SEND")?.unwrap_or(Commitment::Confirmed),
            priority_fee_min: integer("SOLANA_PRIORITY_FEE_MIN_MICROLAMPORTS")?,
            priority_fee_max: integer("SOLANA_PRIORITY_FEE_MAX_MICROLAMPORTS")?,
            identity_memo: first(&IDENTITY_KEYS).map(|(_, v)| v),
            jupiter_base_url,
            jito_url,
            jito_enabled,
            ..Self::default()
        };

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            endpoints = ?config.endpoints.candidates(None),
            read = %config.read_commitment,
            send = %config.send_commitment,
            jito = config.jito_enabled,
            "resolved solana core configuration"
        );

        Ok(config)
    }

    /// Resolves the commitment for a purpose, honoring an explicit override.
    #[must_use]
    pub fn commitment_for(&self, purpose: RpcPurpose, override_: Option<Commitment>) -> Commitment {
        override_.unwrap_or(match purpose {
            RpcPurpose::Read => self.read_commitment,
            RpcPurpose::Send => self.send_commitment,
        })
    }

    /// Sets the endpoint list.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EndpointList) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the health TTL.
    #[must_use]
    pub const fn with_health_ttl(mut self, ttl: Duration) -> Self {
        self.health_ttl = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = SolanaCoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SolanaCoreConfig::default());
        assert_eq!(config.health_ttl, Duration::from_secs(45));
        assert_eq!(config.jupiter_base_url.as_str(), "https://quote-api.jup.ag/");
    }

    #[test]
    fn primary_precedence_and_fallback_dedup() {
        let config = SolanaCoreConfig::from_lookup(lookup(&[
            ("SOLANA_RPC_URL", "https://second.example.com"),
            ("SOLANA_RPC_PRIMARY", " https://first.example.com/ "),
            (
                "SOLANA_RPC_URLS",
                "https://first.example.com,https://third.example.com/",
            ),
        ]))
        .unwrap();
        assert_eq!(
            config.endpoints.candidates(None),
            vec!["https://first.example.com", "https://third.example.com"]
        );
    }

    #[test]
    fn commitments_resolve_by_purpose() {
        let config = SolanaCoreConfig::from_lookup(lookup(&[
            ("SOLANA_COMMITMENT_READ", "processed"),
            ("SOLANA_COMMITMENT_SEND", "finalized"),
        ]))
        .unwrap();
        assert_eq!(config.commitment_for(RpcPurpose::Read, None), Commitment::Processed);
        assert_eq!(config.commitment_for(RpcPurpose::Send, None), Commitment::Finalized);
        assert_eq!(
            config.commitment_for(RpcPurpose::Send, Some(Commitment::Confirmed)),
            Commitment::Confirmed
        );
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = SolanaCoreConfig::from_lookup(lookup(&[("SOLANA_COMMITMENT_READ", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCommitment { key: "SOLANA_COMMITMENT_READ", .. }));

        let err = SolanaCoreConfig::from_lookup(lookup(&[(
            "SOLANA_PRIORITY_FEE_MAX_MICROLAMPORTS",
            "lots",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInteger { .. }));
    }

    #[test]
    fn identity_and_jito_settings() {
        let config = SolanaCoreConfig::from_lookup(lookup(&[
            ("FARTNODE_ACTION_IDENTITY_PUBKEY", "  Ident1ty  "),
            ("JITO_BUNDLE_URL", "https://jito.example.com/api/v1/bundles"),
            ("FARTNODE_JITO_ENABLED", "TRUE"),
            ("SOLANA_PRIORITY_FEE_MIN_MICROLAMPORTS", "100"),
        ]))
        .unwrap();
        assert_eq!(config.identity_memo.as_deref(), Some("Ident1ty"));
        assert!(config.jito_enabled);
        assert_eq!(
            config.jito_url.as_ref().map(Url::as_str),
            Some("https://jito.example.com/api/v1/bundles")
        );
        assert_eq!(config.priority_fee_min, Some(100));
    }
}
