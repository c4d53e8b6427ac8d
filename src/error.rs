use thiserror::Error;

/// Failure of a backend request, as seen by every observer of the query.
///
/// Cloneable so one failed in-flight request can be handed to all callers that
/// joined it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API request failed: {status} {status_text}")]
    Http { status: u16, status_text: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RequestError {
    /// HTTP status code, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RequestError::InvalidResponse(err.to_string())
        } else {
            RequestError::Network(err.to_string())
        }
    }
}
