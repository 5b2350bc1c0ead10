use thiserror::Error;

/// Application-wide error types for Herald.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request could not be made or its body could not be read.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The origin answered with a non-2xx status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// The origin answered with a 3xx. `location` is absolute. The HTTP
    /// client never follows redirects itself; the engine decides per hop.
    #[error("HTTP {status} redirect from {url} to {location}")]
    Redirect {
        status: u16,
        url: String,
        location: String,
    },

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// A domain string normalized to nothing usable.
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// A pagination cursor failed to decode or validate.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Caller-supplied parameters were rejected.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// Returns true for errors caused by the caller's input rather than
    /// by the engine or a remote origin.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::ValidationError(_) | AppError::InvalidCursor(_) | AppError::InvalidDomain(_)
        )
    }

    /// Whether trying the same request again might succeed: timeouts,
    /// connection failures, 5xx and 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Timeout(_) | AppError::NetworkError(_) => true,
            AppError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
