// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Gemini REST API client (Files API + generateContent)

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::ingestion::FileState;
use crate::{Result, VidlensError};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// File resource as returned by the Files API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
    #[serde(default)]
    pub error: Option<ApiStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiStatus,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    pub fn file(mime_type: &str, file_uri: &str) -> Self {
        Self {
            file_data: Some(FileData {
                mime_type: mime_type.to_string(),
                file_uri: file_uri.to_string(),
            }),
            ..Default::default()
        }
    }

    pub fn function_response(name: &str, response: serde_json::Value) -> Self {
        Self {
            function_response: Some(FunctionResponse { name: name.to_string(), response }),
            ..Default::default()
        }
    }
}

impl GenerateResponse {
    /// Content of the first candidate, if any
    pub fn first_content(&self) -> Option<&Content> {
        self.candidates.first().and_then(|c| c.content.as_ref())
    }
}

impl Content {
    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts.iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts.iter().filter_map(|p| p.function_call.as_ref()).collect()
    }
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        // Normalize URL
        let base_url = base_url
            .trim_end_matches('/')
            .trim_end_matches("/v1beta")
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Check if the API is reachable with the configured key
    pub async fn health_check(&self) -> Result<()> {
        self.list_models().await.map(|_| ())
    }

    /// List available models (without the `models/` prefix)
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self.client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let models: ModelsResponse = check_status(response).await?.json().await?;
        Ok(models.models.into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }

    /// Check if a specific model is available
    pub async fn model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m == model))
    }

    /// Upload a local file with the raw upload protocol
    pub async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<RemoteFile> {
        let url = format!("{}/upload/v1beta/files", self.base_url);
        let data = tokio::fs::read(path).await?;

        debug!("Uploading {} bytes to Gemini Files API ({})", data.len(), mime_type);

        let response = self.client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(CONTENT_TYPE, mime_type)
            .body(data)
            .send()
            .await?;

        let uploaded: UploadResponse = check_status(response).await?.json().await?;
        Ok(uploaded.file)
    }

    /// Fetch a file resource by name (`files/abc123`)
    pub async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        let url = format!("{}/v1beta/{}", self.base_url, name);

        let response = self.client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Run one generateContent call
    pub async fn generate_content(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        debug!("Sending request to Gemini: model={}, turns={}", model, request.contents.len());

        let response = self.client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

/// Turn a non-success response into `VidlensError::Gemini`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Err(VidlensError::Gemini {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_upload_file_sends_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .and(header("x-goog-api-key", "test-key"))
            .and(header("X-Goog-Upload-Protocol", "raw"))
            .and(header("content-type", "video/mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file": {
                    "name": "files/abc",
                    "uri": "https://example.test/files/abc",
                    "mimeType": "video/mp4",
                    "state": "PROCESSING"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"fake video").unwrap();

        let file = client(&server).upload_file(&video, "video/mp4").await.unwrap();
        assert_eq!(file.name, "files/abc");
        assert_eq!(file.state, FileState::Processing);
    }

    #[tokio::test]
    async fn test_get_file_parses_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "files/abc",
                "uri": "https://example.test/files/abc",
                "mimeType": "video/mp4",
                "state": "ACTIVE"
            })))
            .mount(&server)
            .await;

        let file = client(&server).get_file("files/abc").await.unwrap();
        assert_eq!(file.state, FileState::Active);
    }

    #[tokio::test]
    async fn test_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        match client(&server).list_models().await {
            Err(VidlensError::Gemini { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("Expected Gemini error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_model_available_strips_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{ "name": "models/gemini-2.0-flash-exp" }]
            })))
            .mount(&server)
            .await;

        let gemini = client(&server);
        assert!(gemini.model_available("gemini-2.0-flash-exp").await.unwrap());
        assert!(!gemini.model_available("gemini-1.0-pro").await.unwrap());
    }

    #[tokio::test]
    async fn test_generate_content_serializes_camel_case() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "fileData": { "mimeType": "video/mp4", "fileUri": "uri://v" } }, { "text": "hi" }]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": "hello" }] } }]
            })))
            .mount(&server)
            .await;

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::file("video/mp4", "uri://v"), Part::text("hi")],
            }],
            system_instruction: None,
            tools: Vec::new(),
        };

        let response = client(&server).generate_content("gemini-test", &request).await.unwrap();
        assert_eq!(response.first_content().unwrap().text(), "hello");
    }
}
