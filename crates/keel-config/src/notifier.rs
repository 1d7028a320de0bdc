use serde::Deserialize;

/// Operator notification for classified errors
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifierConfig {
    /// Whether error mail is sent at all; when false, errors are only logged
    #[serde(default)]
    pub enabled: bool,
    /// Application name included in notification subjects and bodies
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Operator recipients; one message is sent per address
    #[serde(default)]
    pub operators: Vec<String>,
    /// Template rendered as the notification body
    #[serde(default = "default_error_template")]
    pub error_template: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            app_name: default_app_name(),
            operators: Vec::new(),
            error_template: default_error_template(),
        }
    }
}

fn default_app_name() -> String {
    "keel".to_owned()
}

fn default_error_template() -> String {
    "mails/error.html".to_owned()
}
