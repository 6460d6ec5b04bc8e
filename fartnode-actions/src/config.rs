//! Actions server configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//! Engine settings (RPC endpoints, commitments, fee bounds, Jupiter and Jito)
//! are not part of this file; they come from the environment through
//! [`SolanaCoreConfig`](fartnode::SolanaCoreConfig).
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 4022
//! public_origin = "https://actions.example.com"
//! devnet_rpc_url = "${DEVNET_RPC_URL}"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `config.toml`)
//! - `HOST` - Override server bind address
//! - `PORT` - Override server port

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

/// Devnet endpoint used by the airdrop route unless configured otherwise.
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Top-level actions server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Server bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Server port (default: `4022`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin used when rendering Blink URLs. Derived from the request's
    /// `Host` header when unset.
    #[serde(default)]
    pub public_origin: Option<Url>,

    /// Endpoint the devnet airdrop route always targets.
    #[serde(default = "default_devnet_rpc_url")]
    pub devnet_rpc_url: String,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_origin: None,
            devnet_rpc_url: default_devnet_rpc_url(),
        }
    }
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    4022
}

fn default_devnet_rpc_url() -> String {
    DEFAULT_DEVNET_RPC_URL.to_owned()
}

impl ActionsConfig {
    /// Loads configuration from the path given by the `CONFIG` environment
    /// variable, falling back to `config.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "config.toml".to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the defaults. `HOST` and `PORT` env vars
    /// override the file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };

        let mut config = Self::parse(&content, |name| std::env::var(name).ok())?;

        if let Some(host) = std::env::var("HOST").ok().and_then(|h| h.parse().ok()) {
            config.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }

        Ok(config)
    }

    /// Parses TOML after expanding `$VAR` references through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a TOML error if the expanded text does not parse.
    pub fn parse<F>(content: &str, lookup: F) -> Result<Self, toml::de::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        toml::from_str(&expand_vars(content, lookup))
    }

    /// The configured public origin without a trailing slash.
    #[must_use]
    pub fn origin(&self) -> Option<String> {
        self.public_origin
            .as_ref()
            .map(|url| url.as_str().trim_end_matches('/').to_owned())
    }
}

/// Expands `$VAR` and `${VAR}` patterns through `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        match lookup(&var_name).filter(|_| !var_name.is_empty()) {
            Some(value) => result.push_str(&value),
            None if braced => {
                result.push_str("${");
                result.push_str(&var_name);
                if !var_name.is_empty() {
                    result.push('}');
                }
            }
            None => {
                result.push('$');
                result.push_str(&var_name);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "DEVNET" => Some("https://devnet.helius.example".to_owned()),
            "ORIGIN" => Some("https://blinks.example".to_owned()),
            _ => None,
        }
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = ActionsConfig::parse("", lookup).unwrap();
        assert_eq!(config, ActionsConfig::default());
        assert_eq!(config.port, 4022);
        assert_eq!(config.devnet_rpc_url, DEFAULT_DEVNET_RPC_URL);
    }

    #[test]
    fn variables_are_expanded() {
        let config = ActionsConfig::parse(
            "port = 8080\npublic_origin = \"$ORIGIN/\"\ndevnet_rpc_url = \"${DEVNET}\"\n",
            lookup,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.origin().as_deref(), Some("https://blinks.example"));
        assert_eq!(config.devnet_rpc_url, "https://devnet.helius.example");
    }

    #[test]
    fn unresolved_variables_are_left_alone() {
        assert_eq!(expand_vars("a $MISSING b ${ALSO} $", lookup), "a $MISSING b ${ALSO} $");
    }
}
