use sqlx::PgPool;

use crate::clients::models::Client;

/// Repository for client records
#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        broker_id: Option<i32>,
        unit_id: Option<i32>,
    ) -> Result<Client, sqlx::Error> {
        sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (first_name, last_name, email, broker_id, unit_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, email, broker_id, unit_id, created_at
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(broker_id)
        .bind(unit_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Clients newest first, optionally only those owned by `broker_id`
    pub async fn list(&self, broker_id: Option<i32>) -> Result<Vec<Client>, sqlx::Error> {
        sqlx::query_as::<_, Client>(
            r#"
            SELECT id, first_name, last_name, email, broker_id, unit_id, created_at
            FROM clients
            WHERE $1::INT IS NULL OR broker_id = $1
            ORDER BY id DESC
            "#,
        )
        .bind(broker_id)
        .fetch_all(&self.pool)
        .await
    }
}
