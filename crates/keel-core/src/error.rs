use http::StatusCode;

/// A failure that has been classified into an HTTP-visible outcome
///
/// The status code and message are safe to log. The retained cause is for
/// logging and operator notification only and is never serialized into a
/// client response.
#[derive(Debug)]
pub struct AppError {
    code: StatusCode,
    message: String,
    cause: Option<anyhow::Error>,
}

impl AppError {
    /// Create a classified error with an explicit status code
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 400 with an application-supplied message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 403 with a generic message
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    /// 404 with a generic message
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }

    /// 405 with a generic message
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    /// 500 with an application-supplied message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attach the underlying cause for logging and notification
    #[must_use]
    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        self.cause = Some(cause);
        self
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Message safe to log (not necessarily safe to show end users)
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The retained underlying failure, if any
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code.as_u16(), self.message)?;
        if let Some(ref cause) = self.cause {
            write!(f, ": {cause:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| -> &(dyn std::error::Error + 'static) { cause.as_ref() })
    }
}

/// What a handler returns when it fails
///
/// A sum type instead of downcasting: application code signals HTTP-visible
/// outcomes with the `Classified` variant (usually via the [`AppError`]
/// constructors and `?`), while everything else travels as `Unclassified`
/// until the adapter classifies it.
#[derive(Debug)]
pub enum Failure {
    /// Already carries an HTTP status
    Classified(AppError),
    /// Arbitrary failure, classified as 500 at the adapter boundary
    Unclassified(anyhow::Error),
}

impl Failure {
    /// Normalize into a classified error
    ///
    /// Total and idempotent: classified failures pass through unchanged,
    /// unclassified ones become a 500 whose message is the rendered error
    /// chain and whose cause is the original error.
    #[must_use]
    pub fn classify(self) -> AppError {
        match self {
            Self::Classified(error) => error,
            Self::Unclassified(cause) => {
                let message = format!("{cause:#}");
                AppError::internal(message).with_cause(cause)
            }
        }
    }
}

impl From<AppError> for Failure {
    fn from(error: AppError) -> Self {
        Self::Classified(error)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(cause: anyhow::Error) -> Self {
        Self::Unclassified(cause)
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classified(error) => error.fmt(f),
            Self::Unclassified(cause) => write!(f, "{cause:#}"),
        }
    }
}
