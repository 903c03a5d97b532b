// JWT token generation and validation service

use crate::auth::{
    error::AuthError,
    models::{AccountKind, Role},
};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// Tokens are valid for one day; there is no refresh, callers log in again
pub const TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub role: Role,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
}

/// Token service for JWT operations
///
/// Keys are derived once from the configured secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenService {
    /// Create a new TokenService with secret key
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            ttl_seconds: TOKEN_TTL_SECONDS,
        }
    }

    /// Issue a signed identity token
    pub fn issue(&self, id: i32, role: Role, kind: AccountKind) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            id,
            role,
            kind,
            iat: now,
            exp: now + self.ttl_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded identity
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes";

    fn test_token_service() -> TokenService {
        TokenService::new(SECRET)
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Admin),
            Just(Role::Manager),
            Just(Role::Agent),
            Just(Role::Client),
        ]
    }

    fn kind_strategy() -> impl Strategy<Value = AccountKind> {
        prop_oneof![Just(AccountKind::SystemAccount), Just(AccountKind::BrokerAccount)]
    }

    #[test]
    fn test_token_expiration_is_one_day() {
        let service = test_token_service();
        let token = service.issue(1, Role::Admin, AccountKind::SystemAccount).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn test_claims_use_wire_names() {
        let service = test_token_service();
        let token = service.issue(9, Role::Agent, AccountKind::BrokerAccount).unwrap();

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        let raw = decode::<serde_json::Value>(&token, &DecodingKey::from_secret(b""), &validation)
            .unwrap()
            .claims;

        assert_eq!(raw["id"], 9);
        assert_eq!(raw["role"], "AGENT");
        assert_eq!(raw["type"], "BROKER_ACCOUNT");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = Claims {
            id: 1,
            role: Role::Admin,
            kind: AccountKind::SystemAccount,
            iat: Utc::now().timestamp() - 2 * TOKEN_TTL_SECONDS,
            exp: Utc::now().timestamp() - TOKEN_TTL_SECONDS,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = test_token_service().verify(&token);
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let service = test_token_service();

        for token in [
            "",
            "not.a.token",
            "invalid_token_format",
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid.signature",
        ] {
            assert!(matches!(service.verify(token), Err(AuthError::InvalidToken)));
        }
    }

    #[test]
    fn test_token_signature_verification() {
        let service1 = TokenService::new("secret1");
        let service2 = TokenService::new("secret2");

        let token = service1.issue(1, Role::Manager, AccountKind::SystemAccount).unwrap();

        assert!(service1.verify(&token).is_ok());
        assert!(matches!(service2.verify(&token), Err(AuthError::InvalidToken)));
    }

    proptest! {
        #[test]
        fn prop_token_round_trips_identity(
            id in 1i32..1_000_000,
            role in role_strategy(),
            kind in kind_strategy(),
        ) {
            let service = test_token_service();
            let token = service.issue(id, role, kind)?;
            let claims = service.verify(&token)?;

            prop_assert_eq!(claims.id, id);
            prop_assert_eq!(claims.role, role);
            prop_assert_eq!(claims.kind, kind);
            prop_assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECONDS);
        }

        #[test]
        fn prop_random_strings_are_rejected(malformed in "[a-zA-Z0-9]{10,50}") {
            let service = test_token_service();
            prop_assert!(service.verify(&malformed).is_err());
        }
    }
}
