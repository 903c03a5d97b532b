// Authentication service - business logic layer

use std::sync::Arc;

use tracing::{debug, info};
use validator::Validate;

use crate::auth::{
    error::AuthError,
    models::{LoginRequest, LoginResponse, Role},
    password::PasswordService,
    repository::AccountRepository,
    token::TokenService,
};

/// Authentication service coordinating the login flow
pub struct AuthService {
    accounts: AccountRepository,
    tokens: Arc<TokenService>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(accounts: AccountRepository, tokens: Arc<TokenService>) -> Self {
        Self { accounts, tokens }
    }

    /// Log an account in.
    ///
    /// 1. Validates that email and password are present
    /// 2. Resolves the email across system accounts and brokers
    /// 3. Verifies the password hash
    /// 4. Issues a one-day token carrying id, role and account kind
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        request
            .validate()
            .map_err(|_| AuthError::ValidationError("Email and password are required".to_string()))?;

        let account = match self.accounts.find_by_email(&request.email).await? {
            Some(account) => account,
            None => {
                debug!("Login failed: no account for {}", request.email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !PasswordService::verify_password(&request.password, &account.password_hash) {
            debug!("Login failed: bad password for account {}", account.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(account.id, account.role, account.kind)?;
        info!(
            "Account {} logged in as {} ({:?})",
            account.id, account.role, account.kind
        );

        Ok(LoginResponse {
            user: account.into(),
            token,
        })
    }

    /// Create the administrator account, or reset its password if it exists
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<i32, AuthError> {
        let password_hash = PasswordService::hash_password(password)?;
        let id = self
            .accounts
            .upsert_system_account(email, &password_hash, "System", "Administrator", Role::Admin)
            .await?;

        info!("Seeded administrator account {} ({})", id, email);
        Ok(id)
    }
}
