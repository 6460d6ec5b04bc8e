//! Commitment levels and RPC purpose tags.
//!
//! A [`Commitment`] names the finality guarantee requested from an RPC node.
//! A [`RpcPurpose`] tags whether a call reads chain state or submits a
//! transaction; each purpose carries its own configured default commitment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain finality level requested for a read or confirmation.
///
/// Ordered from weakest to strongest: `processed < confirmed < finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the connected node, not yet voted on.
    Processed,
    /// Voted on by a supermajority of the cluster.
    Confirmed,
    /// Rooted; cannot be rolled back.
    Finalized,
}

impl Commitment {
    /// Returns the wire name of the commitment level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown commitment name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown commitment level: {0}")]
pub struct UnknownCommitment(pub String);

impl FromStr for Commitment {
    type Err = UnknownCommitment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            _ => Err(UnknownCommitment(s.to_owned())),
        }
    }
}

/// What an RPC connection is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcPurpose {
    /// Reading chain state (fees, accounts, simulation).
    Read,
    /// Submitting and confirming transactions.
    Send,
}

impl RpcPurpose {
    /// Returns the wire name of the purpose.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Send => "send",
        }
    }
}

impl fmt::Display for RpcPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
