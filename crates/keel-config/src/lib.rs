#![allow(clippy::must_use_candidate)]

//! Configuration for Keel applications
//!
//! TOML-based, with `{{ env.VAR }}` expansion applied to the raw text before
//! deserialization and structural validation after it.

mod env;
mod loader;
pub mod mail;
pub mod notifier;
pub mod server;
pub mod templates;

use serde::Deserialize;

pub use mail::MailConfig;
pub use notifier::NotifierConfig;
pub use server::ServerConfig;
pub use templates::TemplateConfig;

/// Top-level Keel configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Template loading configuration
    #[serde(default)]
    pub templates: TemplateConfig,
    /// Outbound mail configuration
    #[serde(default)]
    pub mail: Option<MailConfig>,
    /// Operator error-notification configuration
    #[serde(default)]
    pub notifier: NotifierConfig,
}
