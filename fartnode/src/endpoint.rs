//! RPC endpoint normalization and prioritized endpoint lists.

use serde::{Deserialize, Serialize};

/// Public endpoints used when nothing is configured.
pub const DEFAULT_ENDPOINTS: [&str; 2] = [
    "https://api.mainnet-beta.solana.com",
    "https://api.mainnet.rpcpool.com",
];

/// Normalizes an endpoint: surrounding whitespace and trailing slashes are removed.
#[must_use]
pub fn normalize_url(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_owned()
}

/// Splits a comma-separated endpoint list, normalizing and dropping empty entries.
#[must_use]
pub fn parse_endpoint_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_url)
        .filter(|endpoint| !endpoint.is_empty())
        .collect()
}

/// A single primary endpoint plus ordered fallbacks.
///
/// Constructed through [`EndpointList::new`], which guarantees that every
/// entry is normalized, non-empty and unique, and that the built-in
/// [`DEFAULT_ENDPOINTS`] are used when nothing was supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointList {
    primary: Option<String>,
    fallbacks: Vec<String>,
}

impl EndpointList {
    /// Builds an endpoint list from an optional primary and raw fallbacks.
    #[must_use]
    pub fn new<I, S>(primary: Option<&str>, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let primary = primary.map(normalize_url).filter(|p| !p.is_empty());
        let mut deduped: Vec<String> = Vec::new();
        for fallback in fallbacks {
            let fallback = normalize_url(fallback.as_ref());
            if fallback.is_empty()
                || primary.as_deref() == Some(fallback.as_str())
                || deduped.contains(&fallback)
            {
                continue;
            }
            deduped.push(fallback);
        }

        if primary.is_none() && deduped.is_empty() {
            return Self::defaults();
        }
        Self {
            primary,
            fallbacks: deduped,
        }
    }

    /// The built-in public endpoints.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            primary: None,
            fallbacks: DEFAULT_ENDPOINTS.iter().map(|e| (*e).to_owned()).collect(),
        }
    }

    /// The configured primary endpoint, if any.
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// The configured fallback endpoints in priority order.
    #[must_use]
    pub fn fallbacks(&self) -> &[String] {
        &self.fallbacks
    }

    /// Returns candidates in priority order.
    ///
    /// An explicit override short-circuits to that single endpoint.
    #[must_use]
    pub fn candidates(&self, override_endpoint: Option<&str>) -> Vec<String> {
        if let Some(endpoint) = override_endpoint.map(normalize_url).filter(|e| !e.is_empty()) {
            return vec![endpoint];
        }
        self.primary
            .iter()
            .chain(self.fallbacks.iter())
            .cloned()
            .collect()
    }

    /// Returns the endpoint that would be tried first.
    #[must_use]
    pub fn first(&self, override_endpoint: Option<&str>) -> String {
        self.candidates(override_endpoint)
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_ENDPOINTS[0].to_owned())
    }
}

impl Default for EndpointList {
    fn default() -> Self {
        Self::defaults()
    }
}
