/// Mail delivery errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// HTTP request to the mail API failed
    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The mail API returned a non-success response
    #[error("mail API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },
}
