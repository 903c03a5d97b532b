// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use tracing::{error, warn};

use crate::auth::models::Role;
use crate::error::ErrorResponse;

/// Authentication and authorization error types
#[derive(Debug)]
pub enum AuthError {
    // Authentication errors
    ValidationError(String),
    /// Unknown email or wrong password; the two are never distinguished
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,
    MissingToken,
    DatabaseError(String),
    PasswordHashError,
    TokenGenerationError(String),

    // Authorization errors
    /// Caller's role is not in the route's allow-list
    InsufficientPermissions {
        actual: Role,
    },
    /// Authorization ran without an identity attached; fails closed
    MissingIdentity,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AuthError::PasswordHashError => write!(f, "Password hashing error"),
            AuthError::TokenGenerationError(msg) => write!(f, "Token generation error: {}", msg),
            AuthError::InsufficientPermissions { actual } => {
                write!(f, "Insufficient permissions for role '{}'", actual)
            }
            AuthError::MissingIdentity => write!(f, "No authenticated identity on request"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = match &self {
            AuthError::ValidationError(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::MissingToken => {
                warn!("Rejected credentials: {}", self);
                "UNAUTHORIZED"
            }
            AuthError::DatabaseError(msg) => {
                error!("Database error in auth: {}", msg);
                "INTERNAL_ERROR"
            }
            AuthError::PasswordHashError => {
                error!("Password hashing error");
                "INTERNAL_ERROR"
            }
            AuthError::TokenGenerationError(msg) => {
                error!("Token generation error: {}", msg);
                "INTERNAL_ERROR"
            }
            AuthError::InsufficientPermissions { .. } | AuthError::MissingIdentity => "FORBIDDEN",
        };

        let body = ErrorResponse::new(code, self.error_message());
        (self.status_code(), Json(body)).into_response()
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::PasswordHashError => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            AuthError::MissingIdentity => StatusCode::FORBIDDEN,
        }
    }

    /// Get a descriptive error message for this error
    /// This message is safe to send to clients (no sensitive data)
    pub fn error_message(&self) -> String {
        match self {
            AuthError::ValidationError(msg) => msg.clone(),
            AuthError::InvalidCredentials => "Invalid email or password".to_string(),
            AuthError::InvalidToken | AuthError::ExpiredToken => {
                "Invalid or expired token.".to_string()
            }
            AuthError::MissingToken => "Access denied. No token provided.".to_string(),
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError
            | AuthError::TokenGenerationError(_) => "Internal server error".to_string(),
            AuthError::InsufficientPermissions { .. } | AuthError::MissingIdentity => {
                "Forbidden: You do not have permission to perform this action.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failures_share_one_message() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidCredentials.error_message(),
            "Invalid email or password"
        );
    }

    #[test]
    fn test_token_failures_are_unauthorized() {
        for err in [AuthError::InvalidToken, AuthError::ExpiredToken, AuthError::MissingToken] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_authorization_failures_are_forbidden() {
        let err = AuthError::InsufficientPermissions { actual: Role::Client };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::MissingIdentity.status_code(), StatusCode::FORBIDDEN);
        // Role names never leak into the client message
        assert!(!err.error_message().contains("CLIENT"));
    }

    #[test]
    fn test_server_failures_hide_details() {
        let err = AuthError::DatabaseError("password authentication failed for user".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_message(), "Internal server error");
    }
}
