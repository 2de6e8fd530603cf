// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Video ingestion: submit an upload, then wait until the service has processed it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::IngestionConfig;
use crate::gemini::{GeminiClient, RemoteFile};
use crate::{Result, VidlensError};

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(rename = "STATE_UNSPECIFIED")]
    Unspecified,
}

impl From<String> for FileState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "PROCESSING" => FileState::Processing,
            "ACTIVE" => FileState::Active,
            "FAILED" => FileState::Failed,
            _ => FileState::Unspecified,
        }
    }
}

/// Opaque reference to an uploaded video on the ingestion service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionHandle {
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    pub state: FileState,
    /// Failure reason reported by the service, if any
    pub failure: Option<String>,
}

impl From<RemoteFile> for IngestionHandle {
    fn from(file: RemoteFile) -> Self {
        Self {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
            state: file.state,
            failure: file.error.map(|e| e.message),
        }
    }
}

/// External upload-processing service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IngestionService: Send + Sync {
    /// Upload a local file, returning a handle in its initial state
    async fn submit(&self, path: &Path, mime_type: &str) -> Result<IngestionHandle>;

    /// Re-read the handle's current state
    async fn fetch(&self, name: &str) -> Result<IngestionHandle>;
}

/// Gemini Files API as an ingestion service
pub struct GeminiFiles {
    client: GeminiClient,
}

impl GeminiFiles {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IngestionService for GeminiFiles {
    async fn submit(&self, path: &Path, mime_type: &str) -> Result<IngestionHandle> {
        let file = self.client.upload_file(path, mime_type).await.map_err(ingestion_error)?;
        info!("Uploaded video as {} ({:?})", file.name, file.state);
        Ok(file.into())
    }

    async fn fetch(&self, name: &str) -> Result<IngestionHandle> {
        let file = self.client.get_file(name).await.map_err(ingestion_error)?;
        Ok(file.into())
    }
}

/// Bounds for the wait on a processing upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&IngestionConfig> for PollPolicy {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        (&IngestionConfig::default()).into()
    }
}

/// Wrap a collaborator failure as an ingestion error, keeping tagged variants intact
pub fn ingestion_error(err: VidlensError) -> VidlensError {
    match err {
        VidlensError::Ingestion(_)
        | VidlensError::IngestionTimeout { .. }
        | VidlensError::Cancelled => err,
        other => VidlensError::Ingestion(other.to_string()),
    }
}

/// Poll until the handle leaves `PROCESSING`.
///
/// Returns the final handle and the number of re-fetches made. Fails with
/// `IngestionTimeout` after `policy.max_attempts` re-fetches, with `Cancelled`
/// as soon as `cancel` fires, and with `Ingestion` if the service reports
/// the file as failed.
pub async fn wait_until_ready(
    service: &dyn IngestionService,
    mut handle: IngestionHandle,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<(IngestionHandle, u32)> {
    let mut attempts = 0u32;

    while handle.state == FileState::Processing {
        if attempts >= policy.max_attempts {
            warn!("{} still processing after {} polls, giving up", handle.name, attempts);
            return Err(VidlensError::IngestionTimeout { attempts });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VidlensError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }

        attempts += 1;
        let name = handle.name.clone();
        handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VidlensError::Cancelled),
            fetched = service.fetch(&name) => fetched.map_err(ingestion_error)?,
        };

        debug!("Poll {}: {} is {:?}", attempts, handle.name, handle.state);
    }

    match handle.state {
        FileState::Failed => Err(VidlensError::Ingestion(format!(
            "{} failed processing: {}",
            handle.name,
            handle.failure.as_deref().unwrap_or("no reason given")
        ))),
        FileState::Unspecified => {
            warn!("{} reported no state, treating it as ready", handle.name);
            Ok((handle, attempts))
        }
        _ => Ok((handle, attempts)),
    }
}

#[cfg(test)]
pub(crate) fn test_handle(name: &str, state: FileState) -> IngestionHandle {
    IngestionHandle {
        name: name.to_string(),
        uri: format!("https://example.test/{}", name),
        mime_type: "video/mp4".to_string(),
        state,
        failure: None,
    }
}
