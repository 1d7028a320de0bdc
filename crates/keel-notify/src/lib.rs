//! Operator notification for classified errors
//!
//! The request layer calls [`Notifier::report`] exactly once per classified
//! error. Reporting is fire-and-forget: every internal failure is swallowed
//! and logged locally, never surfaced to the requester.

use std::sync::Arc;

use async_trait::async_trait;
use keel_config::NotifierConfig;
use keel_core::{AppError, RequestMeta};
use keel_mail::{Mailer, Message};
use keel_templates::TemplateEngine;

/// Side channel for classified errors
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report one classified error; must never fail or block the response
    async fn report(&self, error: &AppError, meta: &RequestMeta);
}

/// Notifier that reports nowhere; the development profile
///
/// Classified errors are still logged by the recovery router, so dropping
/// the external report loses nothing locally.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn report(&self, error: &AppError, meta: &RequestMeta) {
        tracing::debug!(
            request_id = %meta.request_id,
            code = error.code().as_u16(),
            "operator notification disabled"
        );
    }
}

/// Notifier that mails every configured operator
///
/// The body is a rendered template; one message goes to each operator, and a
/// failure for one recipient does not stop the others.
pub struct MailNotifier {
    engine: Arc<dyn TemplateEngine>,
    mailer: Arc<dyn Mailer>,
    app_name: String,
    operators: Vec<String>,
    template: String,
}

impl MailNotifier {
    #[must_use]
    pub fn new(config: &NotifierConfig, engine: Arc<dyn TemplateEngine>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            engine,
            mailer,
            app_name: config.app_name.clone(),
            operators: config.operators.clone(),
            template: config.error_template.clone(),
        }
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn report(&self, error: &AppError, meta: &RequestMeta) {
        for operator in &self.operators {
            let data = serde_json::json!({
                "app_name": self.app_name,
                "operator": operator,
                "error": error.to_string(),
                "request": meta,
            });

            let html_body = match self.engine.render(&[self.template.as_str()], &data) {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!(
                        operator = %operator,
                        template = %self.template,
                        "cannot prepare error notification: {e}"
                    );
                    continue;
                }
            };

            let message = Message {
                to: operator.clone(),
                to_name: None,
                subject: format!("an error occurred in {}", self.app_name),
                html_body,
            };

            if let Err(e) = self.mailer.send(&message).await {
                tracing::error!(operator = %operator, "cannot send error notification: {e}");
            }
        }
    }
}
