use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Outbound mail delivery via an HTTP mail API
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    /// Base URL of the mail API
    pub api_url: Url,
    /// API key sent with every delivery request
    pub api_key: SecretString,
    /// Sender address for outgoing messages
    pub from: String,
    /// Optional display name for the sender
    #[serde(default)]
    pub from_name: Option<String>,
}
