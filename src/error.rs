//! Unified error type.

/// Boxed error accepted from application code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by strand's fallible operations.
///
/// Application-level outcomes (404, 413, 429, etc.) are written to the
/// [`Response`](crate::Response), not returned as `Error`s. This type covers
/// three things: setup failures (bad route patterns, incomplete middleware
/// configuration), infrastructure failures (binding, accepting), and faults
/// raised by handlers, which the pipeline turns into a `500`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    Addr(String),

    #[error("invalid route `{pattern}`: {reason}")]
    InvalidRoute { pattern: String, reason: &'static str },

    #[error("invalid configuration: {0}")]
    Config(&'static str),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A failure raised by application handler code.
    #[error("handler: {0}")]
    Handler(BoxError),

    /// The pipeline settled without ending the response.
    #[error("request finished without a response")]
    Unanswered,
}

impl Error {
    /// Wraps any application error so handlers can propagate it with `?`.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    pub(crate) fn route(pattern: &str, reason: &'static str) -> Self {
        Self::InvalidRoute { pattern: pattern.to_owned(), reason }
    }
}
