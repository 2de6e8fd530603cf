// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Reasoning agent: a Gemini model that can call the web search tool

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::gemini::{Content, FunctionCall, FunctionDeclaration, GeminiClient, GenerateRequest, Part, Tool};
use crate::ingestion::IngestionHandle;
use crate::search::SearchTool;
use crate::{Result, VidlensError};

/// A tool invocation made while answering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub args: serde_json::Value,
}

/// Final answer of the agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    /// Markdown answer
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub model: String,
}

/// Something that answers an instruction about an ingested video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    async fn run(&self, instruction: &str, video: &IngestionHandle) -> Result<AgentResponse>;
}

/// Gemini model with an optional search tool
pub struct GeminiAgent {
    config: AgentConfig,
    client: GeminiClient,
    search: Option<Arc<dyn SearchTool>>,
    max_results: usize,
}

impl GeminiAgent {
    pub fn new(
        config: AgentConfig,
        client: GeminiClient,
        search: Option<Arc<dyn SearchTool>>,
        max_results: usize,
    ) -> Self {
        Self { config, client, search, max_results }
    }

    fn system_instruction(&self) -> Content {
        let mut text = format!(
            "You are {}. You analyze videos and answer questions about them.",
            self.config.name
        );
        if self.search.is_some() {
            text.push_str(" You can search the web to gather additional information.");
        }
        if self.config.markdown {
            text.push_str("\nUse markdown to format your answers.");
        }

        Content {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    fn tools(&self) -> Vec<Tool> {
        let Some(search) = &self.search else {
            return Vec::new();
        };

        vec![Tool {
            function_declarations: vec![FunctionDeclaration {
                name: search.name().to_string(),
                description: search.description().to_string(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "The query to search for." },
                        "max_results": { "type": "integer", "description": "Maximum number of results." }
                    },
                    "required": ["query"]
                }),
            }],
        }]
    }

    /// Run one function call; failures are reported back to the model
    async fn call_tool(&self, call: &FunctionCall) -> serde_json::Value {
        let search = match &self.search {
            Some(s) if s.name() == call.name => s,
            _ => {
                warn!("Model called unknown tool {}", call.name);
                return serde_json::json!({ "error": format!("unknown tool {}", call.name) });
            }
        };

        let query = call.args.get("query").and_then(|q| q.as_str()).unwrap_or_default();
        let max_results = call.args.get("max_results")
            .and_then(|m| m.as_u64())
            .map(|m| m as usize)
            .unwrap_or(self.max_results);

        match search.search(query, max_results).await {
            Ok(hits) => serde_json::json!({ "results": hits }),
            Err(e) => {
                warn!("Search tool failed: {}", e);
                serde_json::json!({ "error": e.to_string() })
            }
        }
    }

    fn render(&self, text: String, tool_calls: &[ToolCallRecord]) -> String {
        if !self.config.show_tool_calls || tool_calls.is_empty() {
            return text;
        }

        let mut out = String::from("Running:\n");
        for call in tool_calls {
            let args = call.args.as_object()
                .map(|obj| obj.iter()
                    .map(|(k, v)| match v.as_str() {
                        Some(s) => format!("{}={}", k, s),
                        None => format!("{}={}", k, v),
                    })
                    .collect::<Vec<_>>()
                    .join(", "))
                .unwrap_or_default();
            out.push_str(&format!(" - {}({})\n", call.name, args));
        }
        out.push('\n');
        out.push_str(&text);
        out
    }
}

fn agent_error(err: VidlensError) -> VidlensError {
    match err {
        VidlensError::Agent(_) => err,
        other => VidlensError::Agent(other.to_string()),
    }
}

#[async_trait]
impl ReasoningAgent for GeminiAgent {
    async fn run(&self, instruction: &str, video: &IngestionHandle) -> Result<AgentResponse> {
        let mut request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::file(&video.mime_type, &video.uri), Part::text(instruction)],
            }],
            system_instruction: Some(self.system_instruction()),
            tools: self.tools(),
        };
        let mut tool_calls = Vec::new();

        for round in 0..=self.config.max_tool_rounds {
            let response = self.client
                .generate_content(&self.config.model, &request)
                .await
                .map_err(agent_error)?;

            let Some(content) = response.first_content().cloned() else {
                let reason = response.candidates.first()
                    .and_then(|c| c.finish_reason.clone())
                    .unwrap_or_else(|| "no candidates".to_string());
                return Err(VidlensError::Agent(format!("model returned no content ({})", reason)));
            };

            let calls: Vec<FunctionCall> = content.function_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                let text = content.text();
                if text.trim().is_empty() {
                    return Err(VidlensError::Agent("model returned an empty answer".to_string()));
                }
                info!("Agent answered after {} tool call(s)", tool_calls.len());
                return Ok(AgentResponse {
                    content: self.render(text, &tool_calls),
                    tool_calls,
                    model: self.config.model.clone(),
                });
            }

            if round == self.config.max_tool_rounds {
                break;
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                if self.config.verbose {
                    info!("Tool call: {}({})", call.name, call.args);
                } else {
                    debug!("Tool call: {}({})", call.name, call.args);
                }
                let result = self.call_tool(call).await;
                results.push(Part::function_response(&call.name, result));
                tool_calls.push(ToolCallRecord {
                    name: call.name.clone(),
                    args: call.args.clone(),
                });
            }

            request.contents.push(Content {
                role: Some("model".to_string()),
                parts: content.parts,
            });
            request.contents.push(Content {
                role: Some("user".to_string()),
                parts: results,
            });
        }

        Err(VidlensError::Agent(format!(
            "model kept calling tools after {} rounds",
            self.config.max_tool_rounds
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{test_handle, FileState};
    use crate::search::{MockSearchTool, SearchHit};
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
    }

    fn call_reply(query: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [
                { "functionCall": { "name": "duckduckgo_search", "args": { "query": query } } }
            ] } }]
        }))
    }

    fn mock_search() -> MockSearchTool {
        let mut search = MockSearchTool::new();
        search.expect_name().return_const("duckduckgo_search");
        search.expect_description().return_const("search the web");
        search
    }

    fn agent(server: &MockServer, search: Option<Arc<dyn SearchTool>>, show_tool_calls: bool) -> GeminiAgent {
        let config = AgentConfig {
            model: "gemini-test".to_string(),
            show_tool_calls,
            max_tool_rounds: 2,
            ..Default::default()
        };
        let client = GeminiClient::new(&server.uri(), "key", Duration::from_secs(5)).unwrap();
        GeminiAgent::new(config, client, search, 5)
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(body_string_contains("Use markdown to format your answers."))
            .respond_with(text_reply("## Ingredients\n- eggs"))
            .expect(1)
            .mount(&server)
            .await;

        let response = agent(&server, None, true)
            .run("describe", &test_handle("files/v", FileState::Active))
            .await
            .unwrap();

        assert_eq!(response.content, "## Ingredients\n- eggs");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.model, "gemini-test");
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("functionResponse"))
            .respond_with(text_reply("Omelette recipe"))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(call_reply("omelette"))
            .expect(1)
            .mount(&server)
            .await;

        let mut search = mock_search();
        search.expect_search()
            .withf(|query, max| query == "omelette" && *max == 5)
            .times(1)
            .returning(|_, _| Ok(vec![SearchHit {
                title: "Omelette".into(),
                url: "https://example.test".into(),
                snippet: "eggs".into(),
            }]));

        let response = agent(&server, Some(Arc::new(search)), true)
            .run("describe", &test_handle("files/v", FileState::Active))
            .await
            .unwrap();

        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(
            response.content,
            "Running:\n - duckduckgo_search(query=omelette)\n\nOmelette recipe"
        );
    }

    #[tokio::test]
    async fn test_endless_tool_calls_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(call_reply("again"))
            .expect(3)
            .mount(&server)
            .await;

        let mut search = mock_search();
        search.expect_search().times(2).returning(|_, _| Ok(Vec::new()));

        let result = agent(&server, Some(Arc::new(search)), false)
            .run("describe", &test_handle("files/v", FileState::Active))
            .await;

        assert!(matches!(result, Err(VidlensError::Agent(_))));
    }

    #[tokio::test]
    async fn test_api_error_becomes_agent_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = agent(&server, None, false)
            .run("describe", &test_handle("files/v", FileState::Active))
            .await;

        match result {
            Err(VidlensError::Agent(msg)) => assert!(msg.contains("boom")),
            other => panic!("Expected agent error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_failure_is_reported_to_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("rate limited"))
            .respond_with(text_reply("answered without search"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(call_reply("omelette"))
            .mount(&server)
            .await;

        let mut search = mock_search();
        search.expect_search()
            .returning(|_, _| Err(VidlensError::Search("rate limited".into())));

        let response = agent(&server, Some(Arc::new(search)), false)
            .run("describe", &test_handle("files/v", FileState::Active))
            .await
            .unwrap();

        assert_eq!(response.content, "answered without search");
    }
}
