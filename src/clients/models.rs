use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_not_blank;

/// Client row; optionally owned by a broker and attached to a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub broker_id: Option<i32>,
    pub unit_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Request body for POST /clients
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(custom(function = "validate_not_blank", message = "firstName is required"))]
    pub first_name: String,
    #[validate(custom(function = "validate_not_blank", message = "lastName is required"))]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    /// Owning broker; defaults to the caller when the caller is a broker
    pub broker_id: Option<i32>,
    pub unit_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_fail_validation() {
        let request: CreateClientRequest = serde_json::from_str(r#"{"email": "x@y.com"}"#).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("last_name"));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn test_whitespace_names_fail_validation() {
        let request: CreateClientRequest = serde_json::from_str(
            r#"{"firstName": "   ", "lastName": "Cruz", "email": "ana@example.com"}"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("first_name"));
    }

    #[test]
    fn test_camel_case_body() {
        let request: CreateClientRequest = serde_json::from_str(
            r#"{"firstName": "Ana", "lastName": "Cruz", "email": "ana@example.com", "unitId": 4}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.unit_id, Some(4));
        assert_eq!(request.broker_id, None);
    }
}
