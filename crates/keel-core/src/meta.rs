use serde::Serialize;

/// Snapshot of the request a classified error belongs to
///
/// Carried alongside the error into logging and notification so reports can
/// be correlated without holding the request itself.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMeta {
    /// Correlation id assigned when the request entered the adapter
    pub request_id: String,
    /// HTTP method
    pub method: String,
    /// Path including the query string
    pub path: String,
}

impl RequestMeta {
    /// Build a snapshot from request parts, assigning a fresh correlation id
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        let path = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());

        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            method: parts.method.to_string(),
            path,
        }
    }
}
