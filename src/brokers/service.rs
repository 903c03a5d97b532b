use tracing::{debug, info, warn};
use validator::Validate;

use crate::auth::{AccountRepository, PasswordService};
use crate::brokers::models::{BrokerResponse, CreateBrokerRequest, NewBroker, UpdateBrokerRequest};
use crate::brokers::repository::BrokerRepository;
use crate::error::ApiError;
use crate::forms::UploadedFile;
use crate::storage::{broker_picture_file_name, UploadStore};

fn email_taken() -> ApiError {
    ApiError::BadRequest {
        message: "A broker with this email already exists".to_string(),
        details: Some("EMAIL_TAKEN".to_string()),
    }
}

/// Service for broker records
#[derive(Clone)]
pub struct BrokerService {
    repo: BrokerRepository,
    accounts: AccountRepository,
    uploads: UploadStore,
}

impl BrokerService {
    pub fn new(repo: BrokerRepository, accounts: AccountRepository, uploads: UploadStore) -> Self {
        Self {
            repo,
            accounts,
            uploads,
        }
    }

    /// Create a broker with nested records and an optional profile picture.
    ///
    /// The picture is written before the transaction and removed again if the
    /// transaction fails.
    pub async fn create(
        &self,
        request: CreateBrokerRequest,
        picture: Option<UploadedFile>,
    ) -> Result<BrokerResponse, ApiError> {
        request.validate()?;

        if self.accounts.system_email_exists(request.email.trim()).await? {
            warn!("Rejected broker signup using system account email {}", request.email);
            return Err(email_taken());
        }

        let password_hash = PasswordService::hash_password(&request.password)?;
        let broker = NewBroker::from_request(request, password_hash);

        let picture_path = match &picture {
            Some(file) => {
                let name = broker_picture_file_name(&broker.first_name, file.file_name.as_deref());
                Some(self.uploads.save(&name, &file.bytes).await?)
            }
            None => None,
        };

        let broker_id = match self.repo.create(&broker, picture_path.as_deref()).await {
            Ok(id) => id,
            Err(err) => {
                self.discard_picture(picture_path.as_deref()).await;
                return Err(match &err {
                    sqlx::Error::Database(db) if db.is_unique_violation() => email_taken(),
                    _ => ApiError::DatabaseError(err),
                });
            }
        };

        info!(
            "Created broker {} with {} references, {} seminars, {} sales experiences",
            broker_id,
            broker.character_references.len(),
            broker.seminars.len(),
            broker.sales_experiences.len()
        );
        self.get(broker_id).await
    }

    /// Update a broker's profile and optionally replace the profile picture.
    ///
    /// The new picture is written before the transaction and removed again if
    /// the transaction fails. Replaced picture files are deleted after the
    /// commit; failures there are logged and skipped.
    pub async fn update(
        &self,
        id: i32,
        request: UpdateBrokerRequest,
        picture: Option<UploadedFile>,
    ) -> Result<BrokerResponse, ApiError> {
        request.validate()?;

        if let Some(email) = request.new_email() {
            if self.accounts.system_email_exists(email).await? {
                warn!("Rejected broker {} update to system account email {}", id, email);
                return Err(email_taken());
            }
        }

        let existing = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Broker", id))?;

        let picture_path = match &picture {
            Some(file) => {
                let first_name = request.merge_into(&existing).first_name;
                let name = broker_picture_file_name(&first_name, file.file_name.as_deref());
                Some(self.uploads.save(&name, &file.bytes).await?)
            }
            None => None,
        };

        let updated = self
            .repo
            .update(id, |locked| request.merge_into(locked), picture_path.as_deref())
            .await;

        let replaced = match updated {
            Ok(Some(replaced)) => replaced,
            Ok(None) => {
                self.discard_picture(picture_path.as_deref()).await;
                return Err(ApiError::not_found("Broker", id));
            }
            Err(err) => {
                self.discard_picture(picture_path.as_deref()).await;
                return Err(match &err {
                    sqlx::Error::Database(db) if db.is_unique_violation() => email_taken(),
                    _ => ApiError::DatabaseError(err),
                });
            }
        };

        // A replacement saved in the same millisecond reuses the old name
        let paths: Vec<&str> = replaced
            .iter()
            .map(|p| p.image_path.as_str())
            .filter(|path| Some(*path) != picture_path.as_deref())
            .collect();
        if !paths.is_empty() {
            let report = self.uploads.remove_all(&paths).await;
            debug!(
                "Broker {}: removed {} replaced pictures, {} failed",
                id,
                report.removed,
                report.failed.len()
            );
        }

        info!(
            "Updated broker {}{}",
            id,
            if picture_path.is_some() { " with a new picture" } else { "" }
        );
        self.get(id).await
    }

    async fn discard_picture(&self, path: Option<&str>) {
        if let Some(path) = path {
            self.uploads.remove_all(&[path]).await;
        }
    }

    /// All brokers with nested records and client counts, newest first
    pub async fn list(&self) -> Result<Vec<BrokerResponse>, ApiError> {
        let brokers = self.repo.list().await?;
        let ids: Vec<i32> = brokers.iter().map(|broker| broker.id).collect();
        let mut relations = self.repo.relations_for(&ids).await?;

        Ok(brokers
            .into_iter()
            .map(|broker| {
                let nested = relations.remove(&broker.id).unwrap_or_default();
                BrokerResponse::new(broker, nested)
            })
            .collect())
    }

    pub async fn get(&self, id: i32) -> Result<BrokerResponse, ApiError> {
        let broker = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Broker", id))?;
        let nested = self
            .repo
            .relations_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        Ok(BrokerResponse::new(broker, nested))
    }
}
