//! Failure routing after classification
//!
//! Applications may register one override handler per recoverable status
//! code. The router logs and reports every classified error exactly once,
//! then either hands the context to the matching override or commits a
//! minimal status-only response.

use std::sync::Arc;

use http::StatusCode;
use keel_core::AppError;
use keel_notify::Notifier;

use crate::context::RequestContext;
use crate::handler::Handler;

/// Immutable set of status-code overrides, built once at startup
#[derive(Default)]
pub struct RecoveryHandlers {
    internal: Option<Arc<dyn Handler>>,
    not_found: Option<Arc<dyn Handler>>,
    forbidden: Option<Arc<dyn Handler>>,
}

impl RecoveryHandlers {
    #[must_use]
    pub fn builder() -> RecoveryBuilder {
        RecoveryBuilder::default()
    }

    /// The override registered for `code`, if any
    ///
    /// An override only ever sees errors carrying its own status code.
    fn for_code(&self, code: StatusCode) -> Option<&Arc<dyn Handler>> {
        match code {
            StatusCode::INTERNAL_SERVER_ERROR => self.internal.as_ref(),
            StatusCode::NOT_FOUND => self.not_found.as_ref(),
            StatusCode::FORBIDDEN => self.forbidden.as_ref(),
            _ => None,
        }
    }
}

/// Builder for [`RecoveryHandlers`]; registering a slot twice keeps the last
#[derive(Default)]
pub struct RecoveryBuilder {
    internal: Option<Arc<dyn Handler>>,
    not_found: Option<Arc<dyn Handler>>,
    forbidden: Option<Arc<dyn Handler>>,
}

impl RecoveryBuilder {
    #[must_use]
    pub fn on_internal_error(mut self, handler: impl Handler + 'static) -> Self {
        self.internal = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn on_not_found(mut self, handler: impl Handler + 'static) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn on_forbidden(mut self, handler: impl Handler + 'static) -> Self {
        self.forbidden = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn build(self) -> RecoveryHandlers {
        RecoveryHandlers {
            internal: self.internal,
            not_found: self.not_found,
            forbidden: self.forbidden,
        }
    }
}

/// Resolve a failed request from its classified error
///
/// Logs the error and reports it to the notifier exactly once, then routes:
/// a matching override that returns `Ok` resolves the request; an override
/// that fails falls to the bare default for the original code, never to
/// another override. The adapter guards this call against override panics.
pub(crate) async fn recover(
    handlers: &RecoveryHandlers,
    notifier: &dyn Notifier,
    ctx: &mut RequestContext,
    error: AppError,
) {
    let meta = ctx.meta();
    tracing::error!(
        request_id = %meta.request_id,
        method = %meta.method,
        path = %meta.path,
        code = error.code().as_u16(),
        cause = ?error.cause(),
        "request failed: {error}"
    );
    notifier.report(&error, ctx.meta()).await;

    let Some(handler) = handlers.for_code(error.code()) else {
        ctx.commit_status(error.code());
        return;
    };

    if let Err(override_failure) = handler.call(ctx).await {
        let override_error = override_failure.classify();
        tracing::error!(
            request_id = %ctx.meta().request_id,
            code = override_error.code().as_u16(),
            "recovery handler failed: {override_error}"
        );
        ctx.commit_status(error.code());
    }
}
