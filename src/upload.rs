// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Uploaded videos and their temporary files

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::UploadConfig;
use crate::{Result, VidlensError};

/// A video received from the user
#[derive(Debug, Clone)]
pub struct VideoUpload {
    file_name: String,
    data: Vec<u8>,
}

/// Temporary on-disk copy of an upload, deleted when dropped
#[derive(Debug)]
pub struct ScopedArtifact {
    file: NamedTempFile,
    mime_type: &'static str,
}

impl VideoUpload {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    /// Read a video from disk (CLI path)
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let file_name = path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        Ok(Self::new(file_name, data))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lowercased file extension, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// BLAKE3 digest of the video bytes
    pub fn digest(&self) -> String {
        blake3::hash(&self.data).to_hex().to_string()
    }

    /// Check the upload against the configured limits
    pub fn validate(&self, config: &UploadConfig) -> Result<()> {
        if self.data.is_empty() {
            return Err(VidlensError::InvalidUpload(format!("{} is empty", self.file_name)));
        }

        if self.data.len() > config.max_bytes {
            return Err(VidlensError::InvalidUpload(format!(
                "{} is {} bytes, limit is {}",
                self.file_name,
                self.data.len(),
                config.max_bytes
            )));
        }

        let ext = self.extension().unwrap_or_default();
        if !config.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
            return Err(VidlensError::InvalidUpload(format!(
                "{} is not one of: {}",
                self.file_name,
                config.allowed_extensions.join(", ")
            )));
        }

        Ok(())
    }

    /// Write the bytes to a temporary file that lives as long as the returned artifact
    pub fn persist(&self) -> Result<ScopedArtifact> {
        let ext = self.extension().unwrap_or_else(|| "mp4".to_string());
        let mut file = tempfile::Builder::new()
            .prefix("vidlens-")
            .suffix(&format!(".{}", ext))
            .tempfile()?;
        file.write_all(&self.data)?;
        file.flush()?;

        debug!("Wrote {} bytes to {:?}", self.data.len(), file.path());

        Ok(ScopedArtifact {
            file,
            mime_type: mime_type_for(&ext),
        })
    }
}

impl ScopedArtifact {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }
}

/// MIME type sent to the ingestion service
pub fn mime_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "video/mp4",
    }
}
