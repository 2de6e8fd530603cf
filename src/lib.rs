// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! vidlens: ask questions about a video
//!
//! Uploads a video to Gemini, waits for it to be processed, and asks a
//! multimodal agent (with DuckDuckGo web search) to analyze it.

pub mod agent;
pub mod config;
pub mod error;
pub mod gemini;
pub mod ingestion;
pub mod orchestrator;
pub mod search;
pub mod shutdown;
pub mod upload;
pub mod web;

pub use config::AppConfig;
pub use error::{Result, VidlensError};
pub use orchestrator::{AnalysisReport, Orchestrator};
pub use upload::VideoUpload;
