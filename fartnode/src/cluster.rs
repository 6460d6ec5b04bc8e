//! Cluster inference and explorer links.
//!
//! Endpoints are matched against known hostname patterns in a fixed order
//! (devnet, testnet, local, mainnet), falling back to [`Cluster::Custom`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Base URL of the Solana explorer transaction page.
pub const EXPLORER_TX_BASE: &str = "https://explorer.solana.com/tx/";

static DEVNET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)devnet").expect("valid devnet pattern"));
static TESTNET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)testnet").expect("valid testnet pattern"));
static LOCAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)localhost|127\.0\.0\.1|:8899").expect("valid local pattern")
});
static MAINNET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)mainnet|rpcpool|helius|quicknode|solana-mainnet")
        .expect("valid mainnet pattern")
});

/// A Solana cluster inferred from an RPC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    /// Mainnet beta.
    Mainnet,
    /// Public devnet.
    Devnet,
    /// Public testnet.
    Testnet,
    /// A local validator.
    Local,
    /// An endpoint that matches no known pattern.
    Custom,
}

impl Cluster {
    /// Infers the cluster from an endpoint URL.
    #[must_use]
    pub fn infer(endpoint: &str) -> Self {
        if DEVNET.is_match(endpoint) {
            Self::Devnet
        } else if TESTNET.is_match(endpoint) {
            Self::Testnet
        } else if LOCAL.is_match(endpoint) {
            Self::Local
        } else if MAINNET.is_match(endpoint) {
            Self::Mainnet
        } else {
            Self::Custom
        }
    }

    /// The explorer `cluster` query value, omitted for mainnet and unknown endpoints.
    #[must_use]
    pub const fn explorer_param(&self) -> Option<&'static str> {
        match self {
            Self::Devnet => Some("devnet"),
            Self::Testnet => Some("testnet"),
            Self::Local => Some("custom"),
            Self::Mainnet | Self::Custom => None,
        }
    }

    /// Coarse network label reported alongside composed transactions.
    #[must_use]
    pub const fn network_label(&self) -> &'static str {
        match self {
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            _ => "mainnet",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mainnet => "mainnet",
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::Local => "local",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Builds an explorer URL for a transaction signature sent through `endpoint`.
#[must_use]
pub fn explorer_tx_url(signature: &str, endpoint: &str) -> String {
    match Cluster::infer(endpoint).explorer_param() {
        Some(param) => format!("{EXPLORER_TX_BASE}{signature}?cluster={param}"),
        None => format!("{EXPLORER_TX_BASE}{signature}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_clusters_in_priority_order() {
        assert_eq!(Cluster::infer("https://api.devnet.solana.com"), Cluster::Devnet);
        assert_eq!(Cluster::infer("https://api.Testnet.solana.com"), Cluster::Testnet);
        assert_eq!(Cluster::infer("http://127.0.0.1:8899"), Cluster::Local);
        assert_eq!(Cluster::infer("http://validator:8899"), Cluster::Local);
        assert_eq!(Cluster::infer("https://mainnet.helius-rpc.com"), Cluster::Mainnet);
        assert_eq!(Cluster::infer("https://api.mainnet.rpcpool.com"), Cluster::Mainnet);
        assert_eq!(Cluster::infer("https://rpc.example.org"), Cluster::Custom);
        // devnet wins over the mainnet keywords
        assert_eq!(Cluster::infer("https://devnet.helius-rpc.com"), Cluster::Devnet);
    }

    #[test]
    fn explorer_url_carries_cluster_param() {
        assert_eq!(
            explorer_tx_url("abc", "https://api.devnet.solana.com"),
            "https://explorer.solana.com/tx/abc?cluster=devnet"
        );
        assert_eq!(
            explorer_tx_url("abc", "http://localhost:8899"),
            "https://explorer.solana.com/tx/abc?cluster=custom"
        );
        assert_eq!(
            explorer_tx_url("abc", "https://api.mainnet-beta.solana.com"),
            "https://explorer.solana.com/tx/abc"
        );
        assert_eq!(
            explorer_tx_url("abc", "https://rpc.example.org"),
            "https://explorer.solana.com/tx/abc"
        );
    }

    #[test]
    fn network_label_collapses_to_mainnet() {
        assert_eq!(Cluster::Local.network_label(), "mainnet");
        assert_eq!(Cluster::Devnet.network_label(), "devnet");
    }
}
