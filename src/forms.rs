// Multipart form collection shared by the unit and broker upload endpoints

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart},
};
use tracing::debug;

use crate::error::ApiError;

/// One uploaded file held in memory until it is written to the upload store
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Text fields and files of a multipart request
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl FormData {
    /// Take a text field out of the form
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

/// Read every part of a multipart body.
///
/// Files are accepted only under `file_field`, at most `max_files` of them.
/// A file input left empty by the browser (no name, no bytes) is skipped.
pub async fn read_form(
    mut multipart: Multipart,
    file_field: &str,
    max_files: usize,
) -> Result<FormData, ApiError> {
    let mut form = FormData::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_none() {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
            continue;
        }

        if name != file_field {
            return Err(ApiError::bad_request(format!("Unexpected file field '{}'", name)));
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|file_name| !file_name.is_empty());
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if file_name.is_none() && bytes.is_empty() {
            continue;
        }

        if form.files.len() == max_files {
            return Err(ApiError::bad_request(format!(
                "Too many files: at most {} allowed in '{}'",
                max_files, file_field
            )));
        }
        form.files.push(UploadedFile { file_name, bytes });
    }

    debug!(
        "Read multipart form: {} fields, {} files",
        form.fields.len(),
        form.files.len()
    );
    Ok(form)
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::BadRequest {
        message: "Malformed multipart body".to_string(),
        details: Some(err.body_text()),
    }
}
