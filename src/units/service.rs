use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::clients::Client;
use crate::error::ApiError;
use crate::forms::UploadedFile;
use crate::storage::{unit_file_name, UploadStore};
use crate::units::models::{Unit, UnitFields, UnitPicture, UnitResponse, UnitStats};
use crate::units::repository::UnitRepository;

/// Service for unit records and their image galleries
///
/// Rows are written first; files are written before the transaction and
/// removed only after a commit.
#[derive(Clone)]
pub struct UnitService {
    repo: UnitRepository,
    uploads: UploadStore,
}

impl UnitService {
    pub fn new(repo: UnitRepository, uploads: UploadStore) -> Self {
        Self { repo, uploads }
    }

    /// All units with pictures and clients, newest first
    pub async fn list(&self) -> Result<Vec<UnitResponse>, ApiError> {
        let units = self.repo.list().await?;
        self.with_relations(units).await
    }

    /// One unit with pictures and clients
    pub async fn get(&self, id: i32) -> Result<UnitResponse, ApiError> {
        let unit = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Unit", id))?;

        self.with_relations(vec![unit])
            .await?
            .pop()
            .ok_or_else(|| ApiError::not_found("Unit", id))
    }

    /// Create a unit from form fields and uploaded images
    pub async fn create(
        &self,
        fields: UnitFields,
        files: Vec<UploadedFile>,
    ) -> Result<UnitResponse, ApiError> {
        let values = fields.into_values()?;
        let image_paths = self.store_files(&files).await?;

        let (unit, pictures) = match self.repo.create(&values, &image_paths).await {
            Ok(created) => created,
            Err(err) => {
                self.discard(&image_paths).await;
                return Err(err.into());
            }
        };

        info!(
            "Created unit {} ({} {}) with {} pictures",
            unit.id,
            unit.unit_type,
            unit.room_no,
            pictures.len()
        );
        Ok(UnitResponse::new(unit, pictures, Vec::new()))
    }

    /// Partially update a unit, add new images and drop `deleted_picture_ids`
    pub async fn update(
        &self,
        id: i32,
        fields: UnitFields,
        files: Vec<UploadedFile>,
        deleted_picture_ids: Vec<i32>,
    ) -> Result<UnitResponse, ApiError> {
        let image_paths = self.store_files(&files).await?;

        let updated = self
            .repo
            .update(
                id,
                |existing| fields.merge_into(existing),
                &image_paths,
                &deleted_picture_ids,
            )
            .await;

        let removed = match updated {
            Ok(Some((_, removed))) => removed,
            Ok(None) => {
                self.discard(&image_paths).await;
                return Err(ApiError::not_found("Unit", id));
            }
            Err(err) => {
                self.discard(&image_paths).await;
                return Err(err);
            }
        };

        if removed.len() < deleted_picture_ids.len() {
            debug!(
                "Unit {}: {} of {} requested pictures belonged to it",
                id,
                removed.len(),
                deleted_picture_ids.len()
            );
        }
        self.remove_files(&removed).await;

        info!(
            "Updated unit {}: {} pictures added, {} removed",
            id,
            image_paths.len(),
            removed.len()
        );
        self.get(id).await
    }

    /// Delete a unit, then its image files
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        let pictures = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Unit", id))?;

        self.remove_files(&pictures).await;
        info!("Deleted unit {} and {} pictures", id, pictures.len());
        Ok(())
    }

    pub async fn stats(&self) -> Result<UnitStats, ApiError> {
        Ok(self.repo.stats().await?)
    }

    async fn with_relations(&self, units: Vec<Unit>) -> Result<Vec<UnitResponse>, ApiError> {
        let ids: Vec<i32> = units.iter().map(|unit| unit.id).collect();

        let mut pictures: HashMap<i32, Vec<UnitPicture>> = HashMap::new();
        for picture in self.repo.pictures_for(&ids).await? {
            pictures.entry(picture.unit_id).or_default().push(picture);
        }

        let mut clients: HashMap<i32, Vec<Client>> = HashMap::new();
        for client in self.repo.clients_for(&ids).await? {
            if let Some(unit_id) = client.unit_id {
                clients.entry(unit_id).or_default().push(client);
            }
        }

        Ok(units
            .into_iter()
            .map(|unit| {
                let unit_pictures = pictures.remove(&unit.id).unwrap_or_default();
                let unit_clients = clients.remove(&unit.id).unwrap_or_default();
                UnitResponse::new(unit, unit_pictures, unit_clients)
            })
            .collect())
    }

    /// Write every upload to disk, undoing the batch if one write fails
    async fn store_files(&self, files: &[UploadedFile]) -> Result<Vec<String>, ApiError> {
        let mut paths = Vec::with_capacity(files.len());
        for file in files {
            let name = unit_file_name(file.file_name.as_deref());
            match self.uploads.save(&name, &file.bytes).await {
                Ok(path) => paths.push(path),
                Err(err) => {
                    self.discard(&paths).await;
                    return Err(err.into());
                }
            }
        }
        Ok(paths)
    }

    /// Remove files written for a request whose database write did not happen
    async fn discard(&self, paths: &[String]) {
        if paths.is_empty() {
            return;
        }
        warn!("Discarding {} uploaded files after a failed write", paths.len());
        self.uploads.remove_all(paths).await;
    }

    async fn remove_files(&self, pictures: &[UnitPicture]) {
        let paths: Vec<&str> = pictures.iter().map(|p| p.image_path.as_str()).collect();
        self.uploads.remove_all(&paths).await;
    }
}
