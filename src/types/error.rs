//! Error types for Vineyard
//!
//! One error enum for the whole service, with a mapping to HTTP status
//! codes so route handlers can translate failures uniformly.

use hyper::StatusCode;

/// Main error type for Vineyard operations
#[derive(Debug, thiserror::Error)]
pub enum VineyardError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Nothing to claim")]
    NothingToClaim,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VineyardError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NothingToClaim => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Telegram(_) => StatusCode::BAD_GATEWAY,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP responses
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for VineyardError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for VineyardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Http(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for VineyardError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for VineyardError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for VineyardError {
    fn from(err: reqwest::Error) -> Self {
        Self::Telegram(err.to_string())
    }
}

/// Result type alias for Vineyard operations
pub type Result<T> = std::result::Result<T, VineyardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            VineyardError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VineyardError::NothingToClaim.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VineyardError::NotFound("user".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            VineyardError::Conflict("self-referral".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            VineyardError::Database("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
