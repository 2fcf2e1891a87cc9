use axum::{extract::Multipart, http::StatusCode};
use std::collections::HashMap;
use tracing::warn;

use super::error::{error_response, ApiError};
use crate::models::Upload;

/// A fully buffered multipart form: text fields plus files, in arrival order
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<Upload>,
}

impl MultipartForm {
    /// Buffer every part. Field names lose a trailing `[]`; a file above
    /// `max_file_size` is rejected before anything is stored.
    pub async fn read(mut multipart: Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            warn!(error = %e, "Malformed multipart body");
            error_response(StatusCode::BAD_REQUEST, format!("Malformed multipart body: {}", e))
        })? {
            let name = normalize_field_name(field.name().unwrap_or_default());
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            let bytes = field.bytes().await.map_err(|e| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read field {}: {}", name, e),
                )
            })?;

            match file_name {
                // Browsers send an empty part for an untouched file input
                Some(file_name) if file_name.is_empty() && bytes.is_empty() => {}
                Some(file_name) => {
                    if bytes.len() > max_file_size {
                        return Err(error_response(
                            StatusCode::PAYLOAD_TOO_LARGE,
                            format!(
                                "File {} is {} bytes, maximum is {} bytes",
                                file_name,
                                bytes.len(),
                                max_file_size
                            ),
                        ));
                    }
                    let mut upload = Upload::new(name, file_name, bytes);
                    upload.content_type = content_type;
                    form.files.push(upload);
                }
                None => {
                    let value = String::from_utf8(bytes.to_vec()).map_err(|_| {
                        error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Field {} is not valid UTF-8", name),
                        )
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// First present text field among `names`
    pub fn text(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.fields.get(*name).cloned())
    }

    /// Remove and return the files of one field, at most `max` of them
    pub fn take_files(&mut self, name: &str, max: usize) -> Result<Vec<Upload>, ApiError> {
        let (taken, rest): (Vec<Upload>, Vec<Upload>) =
            std::mem::take(&mut self.files)
                .into_iter()
                .partition(|upload| upload.field == name);
        self.files = rest;

        if taken.len() > max {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("At most {} files allowed for {}", max, name),
            ));
        }
        Ok(taken)
    }

    pub fn take_file(&mut self, name: &str) -> Result<Option<Upload>, ApiError> {
        Ok(self.take_files(name, 1)?.pop())
    }

    /// Fail when files arrived under a field nothing asked for
    pub fn reject_unexpected_files(&self) -> Result<(), ApiError> {
        match self.files.first() {
            Some(upload) => Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("Unexpected file field: {}", upload.field),
            )),
            None => Ok(()),
        }
    }
}

fn normalize_field_name(name: &str) -> String {
    name.trim().trim_end_matches("[]").to_string()
}
