// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for vidlens

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::VidlensError;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Reasoning agent (Gemini) settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Web search tool settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Upload processing (polling) settings
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Accepted uploads
    #[serde(default)]
    pub upload: UploadConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_true")]
    pub markdown: bool,
    #[serde(default = "default_true")]
    pub show_tool_calls: bool,
    #[serde(default = "default_true")]
    pub verbose: bool,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_search_url")]
    pub url: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestionConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_analysis_prompt")]
    pub analysis: String,
    /// Append the user's question to the analysis instruction
    #[serde(default)]
    pub append_query: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_api_url() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_api_key_env() -> String { "GOOGLE_API_KEY".to_string() }
fn default_model() -> String { "gemini-2.0-flash-exp".to_string() }
fn default_agent_name() -> String { "Video AI Summarizer".to_string() }
fn default_true() -> bool { true }
fn default_timeout() -> u64 { 120 }
fn default_max_tool_rounds() -> u32 { 5 }
fn default_search_url() -> String { "https://api.duckduckgo.com".to_string() }
fn default_max_results() -> usize { 5 }
fn default_poll_interval_ms() -> u64 { 1000 }
fn default_max_poll_attempts() -> u32 { 300 }
fn default_max_bytes() -> usize { 200 * 1024 * 1024 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8501 }

fn default_extensions() -> Vec<String> {
    vec!["mp4".to_string(), "mov".to_string()]
}

fn default_analysis_prompt() -> String {
    "Analyse the uploaded video and determine whether its a cooking video or not.\n\
     If it is a cooking video, then extract all the ingredients and steps to make the particular recipie.\n\
     Provide the response containing ingredients and steps to cook.\n\
     \n\
     Provide a detailed, user-friendly, and actionable response.".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            name: default_agent_name(),
            markdown: true,
            show_tool_calls: true,
            verbose: true,
            timeout_secs: default_timeout(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_search_url(),
            max_results: default_max_results(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_extensions(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            analysis: default_analysis_prompt(),
            append_query: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl IngestionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AgentConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> crate::Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VidlensError::Config(format!("{} not set", self.api_key_env)))
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| VidlensError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make analysis impossible
    pub fn validate(&self) -> crate::Result<()> {
        if self.agent.model.trim().is_empty() {
            return Err(VidlensError::Config("agent.model must not be empty".to_string()));
        }
        if self.ingestion.poll_interval_ms == 0 {
            return Err(VidlensError::Config("ingestion.poll_interval_ms must be > 0".to_string()));
        }
        if self.ingestion.max_poll_attempts == 0 {
            return Err(VidlensError::Config("ingestion.max_poll_attempts must be > 0".to_string()));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(VidlensError::Config("upload.allowed_extensions must not be empty".to_string()));
        }
        Ok(())
    }
}
