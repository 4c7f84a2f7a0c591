use thiserror::Error;

/// Errors returned by the Traceforce API client
///
/// Display renders the server's message as-is so it can be surfaced to
/// Terraform users without rewording.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// HTTP status for errors the server answered with
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
