//! Failure taxonomy for backend calls.
//!
//! Every request that fails is converted into one of these categories at the
//! call site and surfaced as local UI state; nothing here is fatal.

use serde::{Deserialize, Serialize};

/// Fallback message when the backend gives us nothing usable.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// A single structured validation failure, shown inline per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Categorized failure from the API client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// 401, surfaced as a "please login" prompt, never silently retried.
    #[error("authentication required")]
    Unauthorized,
    /// 422 with structured field errors.
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    /// Any other 4xx/5xx, with the backend-provided message when present.
    #[error("{message}")]
    Server { message: String },
    /// No response at all (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(String),
    /// 2xx body that did not parse into the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message suitable for a toast/banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Please login to continue.".to_string(),
            ApiError::Validation(errors) => errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            ApiError::Server { message } => message.clone(),
            ApiError::Network(_) | ApiError::Decode(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = ApiError::Server {
            message: "Table not found".to_string(),
        };
        assert_eq!(err.user_message(), "Table not found");
    }

    #[test]
    fn test_network_errors_fall_back_to_generic_text() {
        let err = ApiError::Network("connection refused".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_validation_surfaces_first_field_message() {
        let err = ApiError::Validation(vec![
            FieldError {
                field: "email".to_string(),
                message: "value is not a valid email address".to_string(),
            },
            FieldError {
                field: "password".to_string(),
                message: "too short".to_string(),
            },
        ]);
        assert_eq!(err.user_message(), "value is not a valid email address");
    }
}
