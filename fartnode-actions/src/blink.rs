//! Solana Actions response types and Blink URL rendering.

use serde::{Deserialize, Serialize};
use url::Url;

/// URL scheme of Solana Action links.
pub const SOLANA_ACTION_PROTOCOL: &str = "solana-action:";

/// Base URL of the Blinks inspector.
pub const BLINKS_INSPECTOR_URL: &str = "https://blinks.inspector.solana.com/";

/// Base58 public key pattern used by address parameters.
pub const PUBKEY_PATTERN: &str = "^[1-9A-HJ-NP-Za-km-z]{32,44}$";

/// Input type of an [`ActionParameter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Single-line text.
    #[default]
    Text,
    /// Numeric input.
    Number,
    /// Multi-line text.
    Textarea,
}

/// One user input of a linked action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameter {
    /// Parameter name, as posted back.
    pub name: String,
    /// Placeholder label.
    pub label: String,
    /// Whether the parameter must be filled in.
    pub required: bool,
    /// Input type.
    #[serde(rename = "type")]
    pub kind: ParameterType,
    /// Validation regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Lower bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ActionParameter {
    /// A parameter of `kind`.
    #[must_use]
    pub fn new(name: &str, label: &str, kind: ParameterType, required: bool) -> Self {
        Self {
            name: name.to_owned(),
            label: label.to_owned(),
            required,
            kind,
            pattern: None,
            min: None,
            max: None,
        }
    }

    /// A required base58 address parameter.
    #[must_use]
    pub fn address(name: &str, label: &str) -> Self {
        Self {
            pattern: Some(PUBKEY_PATTERN.to_owned()),
            ..Self::new(name, label, ParameterType::Text, true)
        }
    }

    /// Sets numeric bounds.
    #[must_use]
    pub const fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

/// Kind of a linked action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkedActionType {
    /// Posts back for a transaction.
    #[default]
    Transaction,
    /// Plain link opened outside the wallet.
    ExternalLink,
}

/// A button or form of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAction {
    /// Kind of action.
    #[serde(rename = "type")]
    pub kind: LinkedActionType,
    /// Target URL or path.
    pub href: String,
    /// Button label.
    pub label: String,
    /// User inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ActionParameter>,
}

impl LinkedAction {
    /// A transaction action posting to `href`.
    #[must_use]
    pub fn transaction(href: &str, label: &str, parameters: Vec<ActionParameter>) -> Self {
        Self {
            kind: LinkedActionType::Transaction,
            href: href.to_owned(),
            label: label.to_owned(),
            parameters,
        }
    }

    /// "Open in Blinks Inspector" link for `blink_url`.
    #[must_use]
    pub fn inspector(blink_url: &str) -> Self {
        let mut href = BLINKS_INSPECTOR_URL.to_owned();
        href.push('#');
        href.push_str(&url::form_urlencoded::byte_serialize(blink_url.as_bytes()).collect::<String>());
        Self {
            kind: LinkedActionType::ExternalLink,
            href,
            label: "Open in Blinks Inspector".to_owned(),
            parameters: Vec::new(),
        }
    }
}

/// Links of an [`ActionGetResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLinks {
    /// Primary action first, then related links.
    pub actions: Vec<LinkedAction>,
}

/// Error shown in place of the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionErrorMessage {
    /// Human-readable text.
    pub message: String,
}

/// `GET` response describing an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGetResponse {
    /// Always `"action"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Icon URL.
    pub icon: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Default button label.
    pub label: String,
    /// Whether the action is disabled.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    /// Error to display instead of the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionErrorMessage>,
    /// Linked actions.
    pub links: ActionLinks,
}

/// Static description of an action, turned into an [`ActionGetResponse`].
#[derive(Debug, Clone)]
pub struct ActionMetadata<'a> {
    /// Title.
    pub title: &'a str,
    /// Description.
    pub description: &'a str,
    /// Icon URL.
    pub icon: &'a str,
    /// Button label.
    pub label: &'a str,
    /// The primary action.
    pub action: LinkedAction,
    /// Extra links shown after the primary action.
    pub related: Vec<LinkedAction>,
}

impl ActionMetadata<'_> {
    /// Builds the `GET` response.
    #[must_use]
    pub fn into_response(self) -> ActionGetResponse {
        let mut actions = Vec::with_capacity(1 + self.related.len());
        actions.push(self.action);
        actions.extend(self.related);
        ActionGetResponse {
            kind: "action".to_owned(),
            icon: self.icon.to_owned(),
            title: self.title.to_owned(),
            description: self.description.to_owned(),
            label: self.label.to_owned(),
            disabled: false,
            error: None,
            links: ActionLinks { actions },
        }
    }
}

/// `POST` response carrying an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPostResponse<M> {
    /// Always `"transaction"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Base64 wire transaction.
    pub transaction: String,
    /// Message shown by the wallet.
    pub message: String,
    /// Hint that wallets should simulate before signing.
    pub simulate_first: bool,
    /// Logs of the server-side simulation.
    pub simulation_logs: Vec<String>,
    /// Route-specific diagnostics.
    pub meta: M,
}

impl<M> ActionPostResponse<M> {
    /// A transaction response.
    #[must_use]
    pub fn transaction(transaction: String, message: &str, simulation_logs: Vec<String>, meta: M) -> Self {
        Self {
            kind: "transaction",
            transaction,
            message: message.to_owned(),
            simulate_first: true,
            simulation_logs,
            meta,
        }
    }
}

/// One path mapping of `actions.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRule {
    /// Website path pattern.
    pub path_pattern: String,
    /// Action API path it maps to.
    pub api_path: String,
}

/// The `actions.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsJson {
    /// Path mappings.
    pub rules: Vec<ActionRule>,
}

impl Default for ActionsJson {
    fn default() -> Self {
        Self {
            rules: vec![
                ActionRule {
                    path_pattern: "/actions/**".to_owned(),
                    api_path: "/api/actions/**".to_owned(),
                },
                ActionRule {
                    path_pattern: "/api/actions/**".to_owned(),
                    api_path: "/api/actions/**".to_owned(),
                },
            ],
        }
    }
}

/// Renders a Blink URL: `blink_base` with an `action` query parameter holding
/// the `solana-action:` link, itself carrying the optional label and message.
///
/// # Errors
///
/// Returns a parse error if either URL is invalid.
pub fn render_blink_url(
    blink_base: &str,
    action_url: &str,
    label: Option<&str>,
    message: Option<&str>,
) -> Result<String, url::ParseError> {
    let action = Url::parse(action_url)?;
    let mut link = format!(
        "{SOLANA_ACTION_PROTOCOL}{}",
        action.as_str().trim_end_matches('/')
    );
    let extras: Vec<(&str, &str)> = [("label", label), ("message", message)]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect();
    if !extras.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(extras)
            .finish();
        link.push(if action.query().is_some() { '&' } else { '?' });
        link.push_str(&query);
    }

    let mut blink = Url::parse(blink_base)?;
    blink.query_pairs_mut().append_pair("action", &link);
    Ok(blink.into())
}
