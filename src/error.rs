// Error handling module for the Brokerage API
// Provides centralized error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::auth::AuthError;
use crate::storage::StorageError;

/// Main error type for the resource endpoints
/// All resource handlers return Result<T, ApiError>
///
/// Each variant maps to a specific HTTP status code. Server-side failures
/// are logged in full and reported to the client with a generic message.
#[derive(Debug)]
pub enum ApiError {
    /// Field-level validation errors from the validator crate
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Malformed request that is not a field validation failure
    /// Maps to HTTP 400 Bad Request
    BadRequest {
        message: String,
        details: Option<String>,
    },

    /// Missing, invalid or expired credentials
    /// Maps to HTTP 401 Unauthorized
    Unauthenticated(String),

    /// Authenticated caller lacks the required role
    /// Maps to HTTP 403 Forbidden
    Forbidden(String),

    /// Resource not found by ID
    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Database operation errors
    /// Maps to HTTP 500 Internal Server Error
    DatabaseError(sqlx::Error),

    /// Upload store failures
    /// Maps to HTTP 500 Internal Server Error
    StorageError(StorageError),

    /// Anything else unexpected
    /// Maps to HTTP 500 Internal Server Error
    InternalError(String),
}

/// Consistent error response structure
///
/// `error` carries the human-readable message that dashboard clients display;
/// `error_code` is machine-readable.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    /// Omitted from JSON when None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            error_code: error_code.to_string(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Shorthand for a 404 on the given resource
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a 400 without details
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging levels follow severity:
    /// - error!: database, storage and internal errors (500-level)
    /// - warn!: authentication and authorization failures
    /// - debug!: expected client errors (validation, not found)
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                let details = serde_json::to_value(errors).unwrap_or(serde_json::json!({}));
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
                        .with_details(details),
                )
            }
            ApiError::BadRequest { message, details } => {
                debug!("Bad request: {}", message);
                let mut body = ErrorResponse::new("BAD_REQUEST", message.clone());
                if let Some(details) = details {
                    body = body.with_details(serde_json::Value::String(details.clone()));
                }
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::Unauthenticated(message) => {
                warn!("Unauthenticated request: {}", message);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("UNAUTHORIZED", message.clone()),
                )
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse::new("FORBIDDEN", message.clone()),
                )
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id)),
                )
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred"),
                )
            }
            ApiError::StorageError(storage_error) => {
                error!("Storage error: {}", storage_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("STORAGE_ERROR", "Failed to store uploaded file"),
                )
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred"),
                )
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::DatabaseError(_)
            | ApiError::StorageError(_)
            | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        ApiError::StorageError(error)
    }
}

/// Auth failures raised inside resource services keep their status class
impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error.status_code() {
            StatusCode::BAD_REQUEST => ApiError::bad_request(error.error_message()),
            StatusCode::UNAUTHORIZED => ApiError::Unauthenticated(error.error_message()),
            StatusCode::FORBIDDEN => ApiError::Forbidden(error.error_message()),
            _ => ApiError::InternalError(error.to_string()),
        }
    }
}
