use std::backtrace::Backtrace;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use futures_util::FutureExt as _;
use futures_util::future::BoxFuture;
use http::{HeaderName, HeaderValue};
use keel_core::{AppError, Failure};
use keel_notify::{NoopNotifier, Notifier};
use keel_templates::{NullEngine, TemplateEngine};
use tracing::Instrument as _;

use crate::context::RequestContext;
use crate::handler::Handler;
use crate::recovery::{RecoveryHandlers, recover};

/// Request bodies are buffered up front; anything larger is rejected
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Shared collaborators for every request served by an [`AppService`]
///
/// Built once at startup and never mutated afterwards.
pub struct AppState {
    recovery: RecoveryHandlers,
    notifier: Arc<dyn Notifier>,
    engine: Arc<dyn TemplateEngine>,
    default_headers: Vec<(HeaderName, HeaderValue)>,
}

impl AppState {
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for [`AppState`]
///
/// Defaults: no recovery overrides, a [`NoopNotifier`], a [`NullEngine`],
/// and no default headers.
pub struct AppStateBuilder {
    recovery: RecoveryHandlers,
    notifier: Arc<dyn Notifier>,
    engine: Arc<dyn TemplateEngine>,
    default_headers: Vec<(HeaderName, HeaderValue)>,
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self {
            recovery: RecoveryHandlers::default(),
            notifier: Arc::new(NoopNotifier),
            engine: Arc::new(NullEngine),
            default_headers: Vec::new(),
        }
    }
}

impl AppStateBuilder {
    #[must_use]
    pub fn recovery(mut self, handlers: RecoveryHandlers) -> Self {
        self.recovery = handlers;
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Add a header applied to every response that does not already set it
    #[must_use]
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.push((name, value));
        self
    }

    #[must_use]
    pub fn build(self) -> AppState {
        AppState {
            recovery: self.recovery,
            notifier: self.notifier,
            engine: self.engine,
            default_headers: self.default_headers,
        }
    }
}

/// Adapter from one fallible [`Handler`] to a tower `Service`
///
/// Mount it on a router with `Router::route_service`. Every request gets a
/// fresh [`RequestContext`]; failures and panics are routed through the
/// recovery handlers, so the service itself is infallible and a panicking
/// handler never takes the process down.
pub struct AppService {
    handler: Arc<dyn Handler>,
    state: Arc<AppState>,
}

impl AppService {
    pub fn new(handler: impl Handler + 'static, state: Arc<AppState>) -> Self {
        Self {
            handler: Arc::new(handler),
            state,
        }
    }
}

impl Clone for AppService {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            state: Arc::clone(&self.state),
        }
    }
}

impl tower::Service<Request> for AppService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let state = Arc::clone(&self.state);
        Box::pin(async move { Ok(serve(handler, state, request).await) })
    }
}

/// One full pass through the request state machine
///
/// Exactly one response leaves this function for every path: handler
/// success, handler failure, panic, or unreadable body.
async fn serve(handler: Arc<dyn Handler>, state: Arc<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let (body, read_failure) = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => (bytes, None),
        Err(e) => (
            bytes::Bytes::new(),
            Some(Failure::from(
                AppError::bad_request("cannot read request body").with_cause(e.into()),
            )),
        ),
    };

    let mut ctx = RequestContext::new(parts, body, Arc::clone(&state.engine));
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.meta().request_id,
        method = %ctx.meta().method,
        path = %ctx.meta().path,
    );

    async {
        let outcome = if let Some(failure) = read_failure {
            Err(failure)
        } else {
            match AssertUnwindSafe(handler.call(&mut ctx)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => Err(panic_failure(&payload)),
            }
        };

        if let Err(failure) = outcome {
            let error = failure.classify();
            let code = error.code();
            // Override handlers are application code too; a panicking
            // override falls to the bare default for the original code
            let attempt = AssertUnwindSafe(recover(
                &state.recovery,
                state.notifier.as_ref(),
                &mut ctx,
                error,
            ))
            .catch_unwind()
            .await;
            if attempt.is_err() {
                tracing::error!(
                    request_id = %ctx.meta().request_id,
                    code = code.as_u16(),
                    "recovery handler panicked"
                );
                ctx.commit_status(code);
            }
        }

        let mut response = ctx.finish();
        for (name, value) in &state.default_headers {
            if !response.headers().contains_key(name) {
                response.headers_mut().insert(name.clone(), value.clone());
            }
        }
        response
    }
    .instrument(span)
    .await
}

fn panic_failure(payload: &(dyn std::any::Any + Send)) -> Failure {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "opaque panic payload".to_owned());
    let backtrace = Backtrace::force_capture();
    Failure::Unclassified(anyhow::anyhow!("handler panicked: {message}\n{backtrace}"))
}
