// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web search tool the agent can call while answering

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::SearchConfig;
use crate::{Result, VidlensError};

/// A single search result handed back to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Search capability exposed to the reasoning agent
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Function name the model calls
    fn name(&self) -> &'static str;

    /// Description shown to the model
    fn description(&self) -> &'static str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

/// DuckDuckGo Instant Answer API
pub struct DuckDuckGo {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a plain topic or a named group of topics
#[derive(Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
    #[serde(rename = "Topics", default)]
    topics: Vec<RelatedTopic>,
}

impl DuckDuckGo {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

impl InstantAnswer {
    fn into_hits(self, max_results: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();

        if !self.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: self.heading.clone(),
                url: self.abstract_url,
                snippet: self.abstract_text,
            });
        }

        let mut stack: Vec<RelatedTopic> = self.related_topics.into_iter().rev().collect();
        while let Some(topic) = stack.pop() {
            if hits.len() >= max_results {
                break;
            }
            if !topic.topics.is_empty() {
                stack.extend(topic.topics.into_iter().rev());
                continue;
            }
            if topic.text.is_empty() {
                continue;
            }
            // Topic text starts with the linked title, e.g. "Omelette A dish made from..."
            let title = topic.text.split(" - ").next().unwrap_or(&topic.text).to_string();
            hits.push(SearchHit {
                title,
                url: topic.first_url,
                snippet: topic.text,
            });
        }

        hits.truncate(max_results);
        hits
    }
}

#[async_trait]
impl SearchTool for DuckDuckGo {
    fn name(&self) -> &'static str {
        "duckduckgo_search"
    }

    fn description(&self) -> &'static str {
        "Search the web with DuckDuckGo. Returns titles, URLs and snippets for the query."
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        debug!("DuckDuckGo search: {:?}", query);

        let response = self.client
            .get(&self.base_url)
            .query(&[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VidlensError::Search(format!(
                "DuckDuckGo returned status {}",
                response.status()
            )));
        }

        // The API answers with a javascript content type, so parse the text ourselves
        let body = response.text().await?;
        let answer: InstantAnswer = serde_json::from_str(&body)?;
        Ok(answer.into_hits(max_results))
    }
}
