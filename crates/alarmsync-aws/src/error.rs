/// Errors from the signed AWS transport client.
///
/// # Examples
///
/// ```rust
/// use alarmsync_aws::error::AwsApiError;
///
/// let err = AwsApiError::MissingCredentials("AWS_ACCESS_KEY_ID");
/// assert!(err.to_string().contains("AWS_ACCESS_KEY_ID"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AwsApiError {
    /// HTTP-level error: non-2xx status whose body could not be decoded as
    /// a structured API error.
    #[error("{service} API HTTP error: status={status}, body={body}")]
    HttpError {
        service: String,
        status: u16,
        body: String,
    },

    /// The API returned a structured error payload.
    #[error("{service} API error: code={code}, message={message}")]
    ApiResponseError {
        service: String,
        code: String,
        message: String,
    },

    /// HMAC signing failed (invalid key length).
    #[error("HMAC signing error: {0}")]
    HmacError(String),

    /// An underlying HTTP transport error from `reqwest`.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A required credential environment variable is unset.
    #[error("Missing AWS credentials: environment variable {0} is not set")]
    MissingCredentials(&'static str),
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, AwsApiError>;
