/// Errors that can occur when talking to Azure Resource Manager or Entra ID.
///
/// # Examples
///
/// ```rust
/// use aks_cloud::error::AksError;
///
/// let err = AksError::ConfigError("tenant id is empty".to_string());
/// assert!(err.to_string().contains("tenant id"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AksError {
    /// HTTP-level error: non-2xx status code from the management API.
    #[error("Azure API HTTP error: status={status}, url={url}, body={body}")]
    HttpError {
        status: u16,
        url: String,
        body: String,
    },

    /// The management API answered with an ARM error payload.
    #[error("Azure API error: code={code}, message={message}")]
    ApiResponseError { code: String, message: String },

    /// The token endpoint rejected the client credentials.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// An underlying HTTP transport error from `reqwest`.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// `next_page` was called on a pager that has no more pages.
    #[error("Pager exhausted")]
    PagerExhausted,

    /// A page pointed to a continuation link that must not be followed.
    #[error("Invalid next link {url}: {reason}")]
    InvalidNextLink { url: String, reason: String },

    /// Credentials or endpoints are missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, AksError>;
