use tracing::info;
use validator::Validate;

use crate::auth::{AuthenticatedUser, Role};
use crate::clients::models::{Client, CreateClientRequest};
use crate::clients::repository::ClientRepository;
use crate::error::ApiError;

/// Service for client records
#[derive(Clone)]
pub struct ClientService {
    repo: ClientRepository,
}

impl ClientService {
    pub fn new(repo: ClientRepository) -> Self {
        Self { repo }
    }

    /// Create a client. A broker caller owns the client unless `brokerId` is set.
    pub async fn create(
        &self,
        caller: &AuthenticatedUser,
        request: CreateClientRequest,
    ) -> Result<Client, ApiError> {
        request.validate()?;

        let broker_id = request
            .broker_id
            .or_else(|| caller.is_broker().then_some(caller.id));

        let client = self
            .repo
            .create(
                request.first_name.trim(),
                request.last_name.trim(),
                request.email.trim(),
                broker_id,
                request.unit_id,
            )
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::BadRequest {
                    message: "A client with this email already exists".to_string(),
                    details: Some("EMAIL_TAKEN".to_string()),
                },
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    ApiError::bad_request("brokerId or unitId does not exist")
                }
                _ => ApiError::DatabaseError(err),
            })?;

        info!("Created client {} (broker {:?})", client.id, client.broker_id);
        Ok(client)
    }

    /// Agents see only their own clients; staff see everyone's
    pub async fn list(&self, caller: &AuthenticatedUser) -> Result<Vec<Client>, ApiError> {
        let owner = (caller.role == Role::Agent).then_some(caller.id);
        Ok(self.repo.list(owner).await?)
    }
}
