//! Outbound mail for Keel
//!
//! [`Mailer`] is the delivery seam; [`HttpMailer`] posts messages to an HTTP
//! mail API, [`MemoryMailer`] captures them for tests.

mod error;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

pub use error::MailError;

/// A single outgoing message
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Recipient address
    pub to: String,
    /// Recipient display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

/// Delivers messages to their recipient
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed to the delivery
    /// backend
    async fn send(&self, message: &Message) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct DeliveryRequest<'a> {
    from: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_name: Option<&'a str>,
    #[serde(flatten)]
    message: &'a Message,
}

/// Async HTTP client for a JSON mail API
#[derive(Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    from: String,
    from_name: Option<String>,
}

impl HttpMailer {
    /// Create a new mailer
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        base_url: Url,
        api_key: SecretString,
        from: String,
        from_name: Option<String>,
    ) -> Result<Self, MailError> {
        let http = reqwest::Client::builder().build().map_err(MailError::Request)?;

        Ok(Self {
            http,
            base_url,
            api_key,
            from,
            from_name,
        })
    }

    /// Create a mailer from the mail configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn from_config(config: &keel_config::MailConfig) -> Result<Self, MailError> {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.from.clone(),
            config.from_name.clone(),
        )
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    /// POST `/messages` with the configured sender and API key
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        let url = self.base_url.join("messages").map_err(|e| MailError::Api {
            status: 0,
            message: format!("invalid URL: {e}"),
        })?;

        let body = DeliveryRequest {
            from: &self.from,
            from_name: self.from_name.as_deref(),
            message,
        };

        let response = self
            .http
            .post(url)
            .header("x-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api { status, message });
        }

        Ok(())
    }
}

/// Mailer that records messages instead of delivering them
///
/// When `fail` is set, every send reports an API failure; used to exercise
/// the notifier's swallow-and-log path.
#[derive(Default)]
pub struct MemoryMailer {
    sent: std::sync::Mutex<Vec<Message>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Messages captured so far
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned
    #[must_use]
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Api {
                status: 503,
                message: "simulated delivery failure".to_owned(),
            });
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Api {
                status: 0,
                message: "mailer lock poisoned".to_owned(),
            })?
            .push(message.clone());
        Ok(())
    }
}
