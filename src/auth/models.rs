// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Role carried in identity tokens and checked by route allow-lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Agent,
    Client,
}

impl Role {
    /// Role assigned to every broker login
    pub const BROKER: Role = Role::Agent;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Agent => "AGENT",
            Role::Client => "CLIENT",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which account table an identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    SystemAccount,
    BrokerAccount,
}

/// Row returned by the combined login lookup over both account tables
#[derive(Debug, Clone, FromRow)]
pub struct AccountRecord {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub kind: AccountKind,
    pub first_name: String,
    pub last_name: String,
    pub contact_no: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Account as returned to clients (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_no: Option<String>,
    pub role: Role,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRecord> for AccountResponse {
    fn from(account: AccountRecord) -> Self {
        Self {
            id: account.id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            contact_no: account.contact_no,
            role: account.role,
            kind: account.kind,
            created_at: account.created_at,
        }
    }
}

/// Login request DTO
///
/// Fields default to empty so a missing field is reported as a 400
/// validation failure rather than a body rejection.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    #[schema(example = "admin@gmail.com")]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
}

/// Login response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: AccountResponse,
    pub token: String,
}

/// Identity decoded from the caller's token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub id: i32,
    pub role: Role,
    #[serde(rename = "type")]
    pub kind: AccountKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::to_string(&Role::BROKER).unwrap(), "\"AGENT\"");
        let role: Role = serde_json::from_str("\"MANAGER\"").unwrap();
        assert_eq!(role, Role::Manager);
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }

    #[test]
    fn test_login_request_only_checks_presence() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"email": "nobody", "password": "x"}"#).unwrap();
        assert!(request.validate().is_ok());

        let request: LoginRequest = serde_json::from_str(r#"{"email": "nobody"}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_account_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&AccountKind::SystemAccount).unwrap(),
            "\"SYSTEM_ACCOUNT\""
        );
        assert_eq!(
            serde_json::to_string(&AccountKind::BrokerAccount).unwrap(),
            "\"BROKER_ACCOUNT\""
        );
    }

    #[test]
    fn test_account_response_omits_password() {
        let record = AccountRecord {
            id: 1,
            email: "admin@gmail.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Admin,
            kind: AccountKind::SystemAccount,
            first_name: "Manager".to_string(),
            last_name: "Admin".to_string(),
            contact_no: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(AccountResponse::from(record)).unwrap();
        assert_eq!(json["role"], "ADMIN");
        assert_eq!(json["type"], "SYSTEM_ACCOUNT");
        assert_eq!(json["firstName"], "Manager");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn test_login_request_missing_fields_fail_validation() {
        let request: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(request.validate().is_err());

        let request: LoginRequest =
            serde_json::from_str(r#"{"email":"admin@gmail.com","password":"123456"}"#).unwrap();
        assert!(request.validate().is_ok());
    }
}
