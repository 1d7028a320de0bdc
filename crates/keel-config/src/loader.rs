use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded = crate::env::expand_env(&raw)
            .map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self =
            toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if notification is enabled without a mail section or
    /// recipients, or if a default header is not a valid HTTP header
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_notifier()?;
        self.validate_default_headers()?;
        Ok(())
    }

    fn validate_notifier(&self) -> anyhow::Result<()> {
        if !self.notifier.enabled {
            return Ok(());
        }

        if self.mail.is_none() {
            anyhow::bail!("notifier.enabled requires a [mail] section");
        }
        if self.notifier.operators.is_empty() {
            anyhow::bail!("notifier.enabled requires at least one operator recipient");
        }

        Ok(())
    }

    fn validate_default_headers(&self) -> anyhow::Result<()> {
        for (name, value) in &self.server.default_headers {
            name.parse::<http::HeaderName>()
                .map_err(|e| anyhow::anyhow!("invalid default header name '{name}': {e}"))?;
            value
                .parse::<http::HeaderValue>()
                .map_err(|e| anyhow::anyhow!("invalid default header value for '{name}': {e}"))?;
        }
        Ok(())
    }
}
