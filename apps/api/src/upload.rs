//! Upload lifecycle management.
//!
//! Inbound binary attachments (resume PDFs, images for object removal) are
//! staged to a temp file before any validation or upstream call. `StagedUpload`
//! owns that path and removes it when dropped, so every exit path of a handler
//! (success, validation failure, upstream failure, early `?`) releases the file.
//! A file already gone at release time is not an error.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use tracing::warn;

use crate::errors::AppError;

/// Hard cap on resume uploads.
pub const MAX_RESUME_BYTES: u64 = 5 * 1024 * 1024;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A multipart attachment staged on local disk for the duration of one request.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    pub size: u64,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
}

impl StagedUpload {
    fn new(
        path: PathBuf,
        size: u64,
        original_name: Option<String>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            path,
            size,
            original_name,
            content_type,
        }
    }

    /// Stages an in-memory buffer to a fresh temp file.
    pub fn from_bytes(
        bytes: &[u8],
        original_name: Option<String>,
        content_type: Option<String>,
    ) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("artifex-upload-")
            .tempfile()?;
        file.write_all(bytes)?;
        // Detach from tempfile's own cleanup; StagedUpload owns removal.
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(Self::new(path, bytes.len() as u64, original_name, content_type))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the staged bytes back from disk.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }

    /// Validation error if the staged file exceeds `limit` bytes.
    pub fn require_max_size(&self, limit: u64) -> Result<(), AppError> {
        if self.size > limit {
            return Err(AppError::Validation(format!(
                "File size exceeds allowed size ({} MB).",
                limit / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove staged upload {:?}: {e}", self.path);
            }
        }
    }
}

/// True iff the buffer starts with the 4-byte PDF signature `%PDF`.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC
}

/// Drains a multipart body, staging the file field named `file_field` to a
/// temp file and collecting every other field as text.
///
/// Returns `None` for the upload when the named file field was absent;
/// presence is an operation-specific validation concern, not a parse error.
pub async fn stage_upload(
    multipart: &mut Multipart,
    file_field: &str,
) -> Result<(Option<StagedUpload>, BTreeMap<String, String>), AppError> {
    let mut upload: Option<StagedUpload> = None;
    let mut fields = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == file_field {
            let original_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;

            let staged = StagedUpload::from_bytes(&data, original_name, content_type)
                .map_err(|e| anyhow::anyhow!("Failed to stage upload: {e}"))?;
            upload = Some(staged);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Malformed field '{name}': {e}")))?;
            fields.insert(name, value);
        }
    }

    Ok((upload, fields))
}
