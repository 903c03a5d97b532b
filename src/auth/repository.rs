// Database access for login identities

use sqlx::PgPool;
use tracing::warn;

use crate::auth::{
    error::AuthError,
    models::{AccountRecord, Role},
};

/// Repository over the two account tables (system accounts and brokers)
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new AccountRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the login identity for an email (case-insensitive).
    ///
    /// Both tables are searched in one query. If the same email exists in
    /// both, the system account is returned and the collision is logged.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AuthError> {
        let mut matches = sqlx::query_as::<_, AccountRecord>(
            r#"
            SELECT id, email, password_hash, role, kind, first_name, last_name, contact_no, created_at
            FROM (
                SELECT 0 AS precedence, id, email, password_hash, role,
                       'SYSTEM_ACCOUNT' AS kind, first_name, last_name, contact_no, created_at
                FROM system_accounts
                WHERE LOWER(email) = LOWER($1)
                UNION ALL
                SELECT 1 AS precedence, id, email, password_hash, $2 AS role,
                       'BROKER_ACCOUNT' AS kind, first_name, last_name,
                       primary_contact AS contact_no, created_at
                FROM brokers
                WHERE LOWER(email) = LOWER($1)
            ) accounts
            ORDER BY precedence, id
            "#,
        )
        .bind(email)
        .bind(Role::BROKER.as_str())
        .fetch_all(&self.pool)
        .await?;

        if matches.len() > 1 {
            warn!(
                "Email {} matches {} accounts across account tables; using the system account",
                email,
                matches.len()
            );
        }

        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }

    /// Check whether a system account already uses this email
    pub async fn system_email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM system_accounts WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    /// Insert or reset a system account, returning its id.
    /// An existing account is matched by email ignoring case.
    pub async fn upsert_system_account(
        &self,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> Result<i32, AuthError> {
        let id: (i32,) = sqlx::query_as(
            r#"
            INSERT INTO system_accounts (email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ((LOWER(email)))
            DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(id.0)
    }
}
