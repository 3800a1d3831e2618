//! Client error types and their normalised, user-facing form.
//!
//! Every failure a screen can hit, whatever its cause, is reduced to an
//! [`ErrorInfo`] so callers render a single message string.

use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised while talking to the parish backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Api {
        status: u16,
        status_text: String,
        message: String,
    },

    /// An HTML page came back where JSON was expected.
    #[error("{message}")]
    HtmlResponse {
        status: u16,
        status_text: String,
        message: String,
    },

    /// The body was JSON but not the expected shape.
    #[error("Unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The session could not be refreshed; the user must log in again.
    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    /// An endpoint path could not be joined onto the API root.
    #[error("Invalid endpoint {0}: {1}")]
    InvalidEndpoint(String, url::ParseError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// HTTP status associated with the error, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::HtmlResponse { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// Whether the failure happened before any response arrived.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Normalise into the uniform `{message, status, statusText}` shape.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        let status_text = match self {
            Self::Api { status_text, .. } | Self::HtmlResponse { status_text, .. } => {
                Some(status_text.clone())
            }
            Self::SessionExpired => Some("Unauthorized".to_string()),
            _ => None,
        };
        ErrorInfo {
            message: self.to_string(),
            status: self.status(),
            status_text,
        }
    }
}

/// The uniform error shape every caller renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub message: String,
    pub status: Option<u16>,
    pub status_text: Option<String>,
}

impl ErrorInfo {
    /// An error that never reached the network.
    #[must_use]
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            status_text: None,
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_info() {
        let err = ClientError::Api {
            status: 404,
            status_text: "Not Found".to_string(),
            message: "Announcement not found".to_string(),
        };
        assert_eq!(
            err.info(),
            ErrorInfo {
                message: "Announcement not found".to_string(),
                status: Some(404),
                status_text: Some("Not Found".to_string()),
            }
        );
    }

    #[test]
    fn test_session_expired_info() {
        let info = ClientError::SessionExpired.info();
        assert_eq!(info.status, Some(401));
        assert!(info.message.contains("log in"));
    }

    #[test]
    fn test_local_error_info() {
        let info = ErrorInfo::local("Passwords do not match");
        assert_eq!(info.to_string(), "Passwords do not match");
        assert_eq!(info.status, None);
    }
}
