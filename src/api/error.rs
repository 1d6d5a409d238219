//! Error taxonomy for backend requests.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Distinguished from generic network failures for messaging only;
    /// both end the attempt.
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    /// Access token missing or expired.
    #[error("Session expired, please log in again")]
    Unauthorized,

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The envelope came back with `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Sign-in refused because the account's email has not been verified yet.
    pub fn is_inactive_account(&self) -> bool {
        matches!(
            self,
            Self::Server { status: 403, message } if message == INACTIVE_ACCOUNT
        )
    }
}

/// Message the backend sends with a 403 for an unactivated account.
const INACTIVE_ACCOUNT: &str = "ERROR_DATA_NOT_ACTIVE";

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for backend calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(ApiError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            ApiError::Server {
                status: 404,
                message: "Meeting not found".to_string()
            }
            .to_string(),
            "Server returned 404: Meeting not found"
        );
        assert!(ApiError::Timeout.is_timeout());
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!ApiError::Network("reset".to_string()).is_timeout());
    }

    #[test]
    fn test_inactive_account_detection() {
        let inactive = ApiError::Server {
            status: 403,
            message: "ERROR_DATA_NOT_ACTIVE".to_string(),
        };
        assert!(inactive.is_inactive_account());

        let forbidden = ApiError::Server {
            status: 403,
            message: "Forbidden".to_string(),
        };
        assert!(!forbidden.is_inactive_account());
        assert!(!ApiError::Unauthorized.is_inactive_account());
    }

    #[test]
    fn test_json_errors_are_decode_errors() {
        let err: ApiError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
