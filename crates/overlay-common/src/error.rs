//! Error types for the WFS overlay engine.

use thiserror::Error;

/// Result type alias using OverlayError.
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Primary error type for overlay fetch operations.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The server returned an OWS/WFS exception document, possibly with
    /// HTTP 200.
    #[error("WFS exception report: {0}")]
    ExceptionReport(String),

    /// The body was neither parseable JSON nor decodable XML.
    #[error("Unparseable response: {0}")]
    Unparseable(String),

    /// Non-2xx HTTP response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The HTTP client hit its request timeout.
    #[error("Request timeout")]
    Timeout,

    /// The server signalled rate limiting.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Connection-level failure (DNS, reset, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// The layer URL could not be combined with query parameters.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The fetch was cancelled because a newer viewport superseded it.
    /// Not a failure: carries no backoff penalty and no visible effect.
    #[error("Request aborted")]
    Aborted,

    /// Every attempt in a fetch cycle was tried and none succeeded.
    #[error("All {attempts} WFS attempts failed, last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<OverlayError>,
    },
}

impl From<serde_json::Error> for OverlayError {
    fn from(err: serde_json::Error) -> Self {
        OverlayError::Unparseable(format!("JSON error: {}", err))
    }
}

impl OverlayError {
    /// Whether this failure should escalate the exponential backoff
    /// (rate-limit and overload signals) rather than apply the flat gate.
    pub fn is_backoff_class(&self) -> bool {
        match self {
            OverlayError::Timeout | OverlayError::RateLimited(_) => true,
            OverlayError::Http { status: 429, .. } => true,
            OverlayError::Http { body, .. } => {
                body.to_lowercase().contains("too many requests")
            }
            OverlayError::Exhausted { last, .. } => last.is_backoff_class(),
            _ => false,
        }
    }
}
