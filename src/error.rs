// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for vidlens

use thiserror::Error;

/// Result type alias for vidlens operations
pub type Result<T> = std::result::Result<T, VidlensError>;

/// vidlens error types
#[derive(Error, Debug)]
pub enum VidlensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Gemini API returned {status}: {message}")]
    Gemini { status: u16, message: String },

    #[error("Please enter a question or insights from the video.")]
    EmptyQuery,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Video still processing after {attempts} polls")]
    IngestionTimeout { attempts: u32 },

    #[error("Agent failed: {0}")]
    Agent(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl VidlensError {
    /// True for failures that happen after a request was accepted
    /// (ingestion, polling, agent invocation), as opposed to input errors.
    pub fn is_analysis_failure(&self) -> bool {
        !matches!(
            self,
            VidlensError::EmptyQuery
                | VidlensError::InvalidUpload(_)
                | VidlensError::Config(_)
                | VidlensError::Template(_)
        )
    }
}
