use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use http::{Method, StatusCode, header};
use keel_core::{AppError, Failure, RequestMeta};
use keel_templates::TemplateEngine;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Write-once channel for the terminal response
///
/// A request gets exactly one terminal write. Committing twice is a
/// programming error: the second write is dropped with an error log and the
/// first one wins.
pub struct ResponseWriter {
    committed: Option<Response>,
}

impl ResponseWriter {
    fn new() -> Self {
        Self { committed: None }
    }

    /// Whether a terminal response has been written
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    pub(crate) fn commit(&mut self, response: Response) {
        if self.committed.is_some() {
            tracing::error!("response already committed, dropping second write");
            return;
        }
        self.committed = Some(response);
    }

    pub(crate) fn into_response(self) -> Option<Response> {
        self.committed
    }
}

/// Per-request façade handed to handlers
///
/// Bundles the request head, the buffered body, the write-once response
/// writer, and the request metadata snapshot. Owned by exactly one in-flight
/// request; never shared across requests.
pub struct RequestContext {
    parts: http::request::Parts,
    body: Bytes,
    meta: RequestMeta,
    writer: ResponseWriter,
    engine: Arc<dyn TemplateEngine>,
}

impl RequestContext {
    pub(crate) fn new(parts: http::request::Parts, body: Bytes, engine: Arc<dyn TemplateEngine>) -> Self {
        let meta = RequestMeta::from_parts(&parts);
        Self {
            parts,
            body,
            meta,
            writer: ResponseWriter::new(),
            engine,
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Request path including the query string
    #[must_use]
    pub fn path(&self) -> &str {
        &self.meta.path
    }

    #[must_use]
    pub fn is_post(&self) -> bool {
        self.parts.method == Method::POST
    }

    /// Look up a request header as UTF-8
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    /// Whether a terminal response has already been written
    #[must_use]
    pub fn responded(&self) -> bool {
        self.writer.is_committed()
    }

    /// Write a 302 redirect; usable as the handler's final statement
    ///
    /// # Errors
    ///
    /// Returns a failure only if `path` is not a valid header value
    pub fn redirect(&mut self, path: &str) -> Result<(), Failure> {
        self.redirect_with(path, StatusCode::FOUND)
    }

    /// Write a 301 redirect; usable as the handler's final statement
    ///
    /// # Errors
    ///
    /// Returns a failure only if `path` is not a valid header value
    pub fn redirect_permanent(&mut self, path: &str) -> Result<(), Failure> {
        self.redirect_with(path, StatusCode::MOVED_PERMANENTLY)
    }

    fn redirect_with(&mut self, path: &str, code: StatusCode) -> Result<(), Failure> {
        let location = http::HeaderValue::from_str(path)
            .map_err(|e| AppError::internal(format!("invalid redirect target: {e}")))?;

        let mut response = Response::new(Body::empty());
        *response.status_mut() = code;
        response.headers_mut().insert(header::LOCATION, location);
        self.writer.commit(response);
        Ok(())
    }

    /// Render a template as the 200 response
    ///
    /// # Errors
    ///
    /// Template failures are returned to the caller for classification, not
    /// written to the response
    pub fn render(&mut self, names: &[&str], data: impl Serialize) -> Result<(), Failure> {
        let value = serde_json::to_value(data).map_err(|e| {
            Failure::from(AppError::internal("template data is not serializable").with_cause(e.into()))
        })?;
        let html = self
            .engine
            .render(names, &value)
            .map_err(|e| Failure::Unclassified(anyhow::Error::new(e)))?;

        let mut response = Response::new(Body::from(html));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/html; charset=utf-8"),
        );
        self.writer.commit(response);
        Ok(())
    }

    /// Serialize `data` as the 200 JSON response
    ///
    /// # Errors
    ///
    /// Serialization failure is returned as a classified 500
    pub fn emit_json(&mut self, data: &impl Serialize) -> Result<(), Failure> {
        let bytes = serde_json::to_vec(data)
            .map_err(|e| AppError::internal("response is not serializable").with_cause(e.into()))?;

        let mut response = Response::new(Body::from(bytes));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        self.writer.commit(response);
        Ok(())
    }

    /// Decode form data into `T`
    ///
    /// Reads the query string for GET/HEAD requests and the urlencoded body
    /// otherwise. Unknown-field entries are filtered from the decode report;
    /// only genuine binding errors surface, classified as 400.
    ///
    /// # Errors
    ///
    /// Returns a classified 400 when a declared field is missing or a value
    /// cannot be bound
    pub fn form_data<T: DeserializeOwned>(&self) -> Result<T, Failure> {
        let raw = if matches!(self.parts.method, Method::GET | Method::HEAD) {
            self.parts.uri.query().unwrap_or("")
        } else {
            std::str::from_utf8(&self.body)
                .map_err(|_| AppError::bad_request("form body is not valid UTF-8"))?
        };

        keel_forms::decode::from_str(raw).map_err(|report| {
            let genuine = report.without_unknown();
            AppError::bad_request(format!("invalid form data: {genuine}")).into()
        })
    }

    /// Decode a JSON body into `T`
    ///
    /// # Errors
    ///
    /// Returns a classified 400 when the body is not valid JSON for `T`
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, Failure> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}")).into())
    }

    /// Write a status-only response with an empty body
    pub(crate) fn commit_status(&mut self, code: StatusCode) {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = code;
        self.writer.commit(response);
    }

    /// Consume the context, yielding the committed response
    ///
    /// An uncommitted context (a handler that succeeded without writing)
    /// degrades to an empty 200.
    pub(crate) fn finish(self) -> Response {
        self.writer.into_response().unwrap_or_else(|| Response::new(Body::empty()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use http_body_util::BodyExt as _;
    use keel_templates::NullEngine;
    use serde::Deserialize;

    use super::*;

    pub(crate) fn context(method: Method, uri: &str, body: &str) -> RequestContext {
        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        RequestContext::new(parts, Bytes::copy_from_slice(body.as_bytes()), Arc::new(NullEngine))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn redirect_commits_found() {
        let mut ctx = context(Method::GET, "/old", "");
        ctx.redirect("/new").unwrap();

        assert!(ctx.responded());
        let response = ctx.finish();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/new");
    }

    #[test]
    fn permanent_redirect_uses_301() {
        let mut ctx = context(Method::GET, "/old", "");
        ctx.redirect_permanent("/new").unwrap();
        assert_eq!(ctx.finish().status(), StatusCode::MOVED_PERMANENTLY);
    }

    #[test]
    fn second_write_is_dropped_and_first_wins() {
        let mut ctx = context(Method::GET, "/", "");
        ctx.redirect("/first").unwrap();
        ctx.redirect("/second").unwrap();

        let response = ctx.finish();
        assert_eq!(response.headers()[header::LOCATION], "/first");
    }

    #[tokio::test]
    async fn emit_json_sets_content_type() {
        let mut ctx = context(Method::GET, "/", "");
        ctx.emit_json(&serde_json::json!({ "ok": true })).unwrap();

        let response = ctx.finish();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_string(response).await, "{\"ok\":true}");
    }

    #[derive(Debug, Deserialize)]
    struct Login {
        username: String,
        #[serde(default)]
        remember: bool,
    }

    #[test]
    fn form_data_reads_query_for_get() {
        let ctx = context(Method::GET, "/login?username=carlos&remember=on", "");
        let form: Login = ctx.form_data().unwrap();
        assert_eq!(form.username, "carlos");
        assert!(form.remember);
    }

    #[test]
    fn form_data_reads_body_for_post() {
        let ctx = context(Method::POST, "/login", "username=carlos");
        let form: Login = ctx.form_data().unwrap();
        assert_eq!(form.username, "carlos");
        assert!(!form.remember);
    }

    #[test]
    fn form_data_ignores_unknown_fields() {
        let ctx = context(Method::POST, "/login", "username=carlos&csrf_token=abc");
        assert!(ctx.form_data::<Login>().is_ok());
    }

    #[test]
    fn form_data_surfaces_genuine_errors_as_400() {
        let ctx = context(Method::POST, "/login", "csrf_token=abc");
        let failure = ctx.form_data::<Login>().unwrap_err();
        let error = failure.classify();
        assert_eq!(error.code(), StatusCode::BAD_REQUEST);
        assert!(error.message().contains("username"));
        // Unknown-field noise stays out of the surfaced message
        assert!(!error.message().contains("csrf_token"));
    }

    #[test]
    fn json_body_failure_is_400() {
        let ctx = context(Method::POST, "/api", "{not json");
        let failure = ctx.json_body::<Login>().unwrap_err();
        assert_eq!(failure.classify().code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn render_without_engine_is_a_failure() {
        let mut ctx = context(Method::GET, "/", "");
        let failure = ctx.render(&["home.html"], serde_json::json!({})).unwrap_err();
        assert_eq!(failure.classify().code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!ctx.responded());
    }

    #[test]
    fn accessors_reflect_the_request() {
        let ctx = context(Method::POST, "/a/b?x=1", "");
        assert!(ctx.is_post());
        assert_eq!(ctx.path(), "/a/b?x=1");
        assert_eq!(ctx.method(), Method::POST);
    }
}
