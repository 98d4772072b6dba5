//! Multipart upload handling

use anyhow::{Result, Context};
use axum::extract::Multipart;
use std::path::{Path, PathBuf};

use crate::consultation::ArtifactKind;

/// One file part as the browser sent it
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-side name; empty when the browser submitted no file
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The `audio` and `image` parts of an upload form
#[derive(Debug, Default)]
pub struct UploadForm {
    pub audio: Option<UploadedFile>,
    pub image: Option<UploadedFile>,
}

impl UploadForm {
    /// Read every part; unknown fields are skipped
    pub async fn read(multipart: &mut Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.context("Malformed multipart body")? {
            let slot = match field.name() {
                Some("audio") => &mut form.audio,
                Some("image") => &mut form.image,
                _ => continue,
            };
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.context("Failed to read upload")?.to_vec();
            *slot = Some(UploadedFile { file_name, bytes });
        }

        Ok(form)
    }
}

/// Write `file` under `dir` with a fresh UUID name keeping `ext`
pub async fn save_upload(dir: &Path, file: &UploadedFile, ext: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(unique_name(ext));
    tokio::fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("Failed to save upload to {}", path.display()))?;
    Ok(path)
}

/// `<uuid-v4>.<ext>`
pub fn unique_name(ext: &str) -> String {
    format!("{}.{}", uuid::Uuid::new_v4(), ext)
}

/// Extension to save `file` with, if `kind` accepts its name
pub fn validated_extension(file: &UploadedFile, kind: ArtifactKind) -> Option<String> {
    kind.accepted_extension(&file.file_name)
}
