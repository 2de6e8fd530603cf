// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Analysis orchestration: upload, wait for processing, ask the agent

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::agent::{GeminiAgent, ReasoningAgent};
use crate::config::{AppConfig, PromptConfig, UploadConfig};
use crate::gemini::GeminiClient;
use crate::ingestion::{self, GeminiFiles, IngestionService, PollPolicy};
use crate::search::{DuckDuckGo, SearchTool};
use crate::upload::VideoUpload;
use crate::{Result, VidlensError};

/// Where an analysis request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Submitting,
    Polling,
    Ready,
    Failed,
    Complete,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::Submitting => "SUBMITTING",
            AnalysisStage::Polling => "POLLING",
            AnalysisStage::Ready => "READY",
            AnalysisStage::Failed => "FAILED",
            AnalysisStage::Complete => "COMPLETE",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub file_name: String,
    pub video_hash: String,
    pub poll_attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Agent answer, unmodified
    pub content: String,
}

/// Runs one video + question through ingestion and the reasoning agent
pub struct Orchestrator {
    ingestion: Arc<dyn IngestionService>,
    agent: Arc<dyn ReasoningAgent>,
    policy: PollPolicy,
    prompts: PromptConfig,
    upload: UploadConfig,
}

impl Orchestrator {
    pub fn new(
        ingestion: Arc<dyn IngestionService>,
        agent: Arc<dyn ReasoningAgent>,
        config: &AppConfig,
    ) -> Self {
        Self {
            ingestion,
            agent,
            policy: PollPolicy::from(&config.ingestion),
            prompts: config.prompts.clone(),
            upload: config.upload.clone(),
        }
    }

    /// Wire up the Gemini-backed collaborators described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.agent.api_key()?;
        let client = GeminiClient::new(
            &config.agent.api_url,
            &api_key,
            Duration::from_secs(config.agent.timeout_secs),
        )?;

        let search: Option<Arc<dyn SearchTool>> = if config.search.enabled {
            Some(Arc::new(DuckDuckGo::new(&config.search)?))
        } else {
            None
        };

        let agent = GeminiAgent::new(
            config.agent.clone(),
            client.clone(),
            search,
            config.search.max_results,
        );

        Ok(Self::new(
            Arc::new(GeminiFiles::new(client)),
            Arc::new(agent),
            config,
        ))
    }

    /// Instruction sent to the agent.
    ///
    /// The configured analysis prompt is used as-is; the user's question is only
    /// added when `prompts.append_query` is set.
    pub fn instruction(&self, query: &str) -> String {
        if self.prompts.append_query {
            format!("{}\n\nUser question: {}", self.prompts.analysis, query.trim())
        } else {
            self.prompts.analysis.clone()
        }
    }

    /// Analyze `upload` for `query`.
    ///
    /// An empty query is rejected before anything touches disk or network. The
    /// temporary copy of the video is removed on every exit path, including
    /// cancellation and dropping the returned future.
    pub async fn analyze(
        &self,
        upload: &VideoUpload,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport> {
        if query.trim().is_empty() {
            return Err(VidlensError::EmptyQuery);
        }
        upload.validate(&self.upload)?;

        let id = Uuid::new_v4();
        let span = info_span!("analysis", %id, file = %upload.file_name());

        async move {
            let result = self.run_stages(id, upload, query, cancel).await;
            if let Err(e) = &result {
                warn!("Stage {}: {}", AnalysisStage::Failed, e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        id: Uuid,
        upload: &VideoUpload,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport> {
        let started_at = Utc::now();
        let artifact = upload.persist()?;

        info!("Stage {}", AnalysisStage::Submitting);
        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VidlensError::Cancelled),
            submitted = self.ingestion.submit(artifact.path(), artifact.mime_type()) => {
                submitted.map_err(ingestion::ingestion_error)?
            }
        };

        info!("Stage {}", AnalysisStage::Polling);
        let (handle, poll_attempts) =
            ingestion::wait_until_ready(self.ingestion.as_ref(), handle, &self.policy, cancel).await?;
        info!("Stage {} after {} poll(s)", AnalysisStage::Ready, poll_attempts);

        let instruction = self.instruction(query);
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VidlensError::Cancelled),
            answered = self.agent.run(&instruction, &handle) => answered.map_err(|e| match e {
                VidlensError::Agent(_) | VidlensError::Cancelled => e,
                other => VidlensError::Agent(other.to_string()),
            })?,
        };

        drop(artifact);
        info!("Stage {}", AnalysisStage::Complete);

        Ok(AnalysisReport {
            id,
            file_name: upload.file_name().to_string(),
            video_hash: upload.digest(),
            poll_attempts,
            started_at,
            finished_at: Utc::now(),
            content: response.content,
        })
    }
}
