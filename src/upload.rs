use crate::error::{ClientError, ClientResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ALLOWED_EXTENSIONS: [&str; 7] = ["pdf", "jpg", "jpeg", "png", "gif", "ppt", "pptx"];
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// A file already stored by the backend, waiting to ride along with the next
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    pub name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: u64,
}

/// A local file the user picked or dropped, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub size: u64,
}

impl FileCandidate {
    pub fn name(&self) -> String {
        file_name(&self.path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn into_attachment(self, fallback_name: &str) -> ClientResult<PendingAttachment> {
        if self.status.as_deref() != Some("success") {
            return Err(ClientError::Application(
                self.error
                    .unwrap_or_else(|| "File upload failed".to_string()),
            ));
        }
        let Some(file_path) = self.file_path else {
            return Err(ClientError::Application(
                "File upload failed: server returned no file reference".to_string(),
            ));
        };

        Ok(PendingAttachment {
            name: self.filename.unwrap_or_else(|| fallback_name.to_string()),
            file_path,
            file_type: self.file_type.unwrap_or_default(),
            file_size: self.file_size.unwrap_or_default(),
        })
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Lower-cased text after the last `.`, or the whole name when there is none.
fn extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_ascii_lowercase()
}

pub fn validate(name: &str, size: u64) -> ClientResult<()> {
    if !ALLOWED_EXTENSIONS.contains(&extension(name).as_str()) {
        return Err(ClientError::Validation(
            "File type not allowed. Please select a PDF, image, or PowerPoint file.".to_string(),
        ));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ClientError::Validation(
            "File too large. Please select a file smaller than 16MB.".to_string(),
        ));
    }
    Ok(())
}

pub fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{bytes} B")
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{:.1} MB", bytes_f / (KIB * KIB))
    }
}
