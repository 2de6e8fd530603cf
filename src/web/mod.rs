// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web UI: upload a video, ask a question, read the answer

mod markdown;
mod templates;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use minijinja::{context, Environment, Value};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::orchestrator::{AnalysisReport, Orchestrator};
use crate::upload::VideoUpload;
use crate::VidlensError;

/// Shared application state
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: AppConfig,
    pub templates: Environment<'static>,
    /// Cancelled on server shutdown; every request works on a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: AppConfig, shutdown: CancellationToken) -> crate::Result<Self> {
        Ok(Self {
            orchestrator,
            config,
            templates: templates::environment()?,
            shutdown,
        })
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Room for the multipart framing around the video
    let body_limit = state.config.upload.max_bytes.saturating_add(1024 * 1024);

    Router::new()
        // Pages
        .route("/", get(index_page))
        .route("/analyze", post(analyze_page))
        .route("/settings", get(settings_page))
        // API endpoints
        .route("/api/analyze", post(api_analyze))
        .route("/api/health", get(api_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error rendered as JSON by the API
pub struct ApiError(VidlensError);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// HTTP status for an analysis error
pub fn status_for(err: &VidlensError) -> StatusCode {
    match err {
        VidlensError::EmptyQuery | VidlensError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
        VidlensError::IngestionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        VidlensError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        VidlensError::Config(_) | VidlensError::Template(_) | VidlensError::FileSystem(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl From<VidlensError> for ApiError {
    fn from(err: VidlensError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

/// Fields of the analysis form
struct AnalysisForm {
    video: Option<VideoUpload>,
    query: String,
}

async fn read_form(mut multipart: Multipart) -> Result<AnalysisForm, VidlensError> {
    let mut form = AnalysisForm {
        video: None,
        query: String::new(),
    };

    while let Some(field) = multipart.next_field().await
        .map_err(|e| VidlensError::InvalidUpload(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("video") => {
                let file_name = field.file_name().unwrap_or("video.mp4").to_string();
                let data = field.bytes().await
                    .map_err(|e| VidlensError::InvalidUpload(e.body_text()))?;
                if !data.is_empty() {
                    form.video = Some(VideoUpload::new(file_name, data.to_vec()));
                }
            }
            Some("query") => {
                form.query = field.text().await
                    .map_err(|e| VidlensError::InvalidUpload(e.body_text()))?;
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn run_analysis(state: &AppState, form: &AnalysisForm) -> Result<AnalysisReport, VidlensError> {
    let video = form.video.as_ref()
        .ok_or_else(|| VidlensError::InvalidUpload("no video file uploaded".to_string()))?;

    // Dropping the request future (client disconnect) also drops the temp file
    let cancel = state.shutdown.child_token();
    let result = state.orchestrator.analyze(video, &form.query, &cancel).await;

    match &result {
        Ok(report) => info!("Analysis {} finished for {}", report.id, report.file_name),
        Err(e) => warn!("Analysis of {} failed: {}", video.file_name(), e),
    }
    result
}

// === Page Handlers ===

fn render_index(
    state: &AppState,
    query: &str,
    result: Option<&str>,
    warning: Option<String>,
    error: Option<String>,
) -> Result<Html<String>, ApiError> {
    let accept = state.config.upload.allowed_extensions.iter()
        .map(|e| format!(".{}", e))
        .collect::<Vec<_>>()
        .join(",");
    let result = result.map(|content| Value::from_safe_string(markdown::to_html(content)));

    let page = state.templates.get_template("index.html")?.render(context! {
        accept,
        query,
        result,
        warning,
        error,
    })?;
    Ok(Html(page))
}

async fn index_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    render_index(&state, "", None, None, None)
}

async fn analyze_page(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            let page = render_index(&state, "", None, None, Some(e.to_string()))?;
            return Ok((status_for(&e), page).into_response());
        }
    };

    if form.video.is_none() {
        let page = render_index(&state, &form.query, None, None, None)?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    let page = match run_analysis(&state, &form).await {
        Ok(report) => (StatusCode::OK, render_index(&state, &form.query, Some(&report.content), None, None)?),
        Err(e @ VidlensError::EmptyQuery) => {
            (status_for(&e), render_index(&state, &form.query, None, Some(e.to_string()), None)?)
        }
        Err(e) => (status_for(&e), render_index(&state, &form.query, None, None, Some(e.to_string()))?),
    };

    Ok(page.into_response())
}

async fn settings_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let page = state.templates.get_template("settings.html")?.render(context! {
        config => &state.config,
    })?;
    Ok(Html(page))
}

// === API Handlers ===

async fn api_analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnalysisReport>, ApiError> {
    let form = read_form(multipart).await?;
    let report = run_analysis(&state, &form).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
    search: bool,
}

async fn api_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.config.agent.model.clone(),
        search: state.config.search.enabled,
    })
}

impl From<minijinja::Error> for ApiError {
    fn from(err: minijinja::Error) -> Self {
        Self(VidlensError::Template(err))
    }
}

/// Start the web server; returns once `shutdown` is cancelled
pub async fn start_server(config: AppConfig, orchestrator: Orchestrator, shutdown: CancellationToken) -> crate::Result<()> {
    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState::new(orchestrator, config, shutdown.clone())?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Web UI available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| VidlensError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentResponse, MockReasoningAgent};
    use crate::ingestion::{test_handle, FileState, MockIngestionService};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    const BOUNDARY: &str = "vidlens-test-boundary";

    fn multipart_body(video: Option<(&str, &[u8])>, query: &str) -> Body {
        let mut body = Vec::new();
        if let Some((name, data)) = video {
            body.extend_from_slice(format!(
                "--{}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"{}\"\r\nContent-Type: video/mp4\r\n\r\n",
                BOUNDARY, name
            ).as_bytes());
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!(
            "--{}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\n{}\r\n--{}--\r\n",
            BOUNDARY, query, BOUNDARY
        ).as_bytes());
        Body::from(body)
    }

    fn post(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(body)
            .unwrap()
    }

    fn router(ingestion: MockIngestionService, agent: MockReasoningAgent) -> Router {
        let mut config = AppConfig::default();
        config.ingestion.poll_interval_ms = 1;
        let orchestrator = Orchestrator::new(Arc::new(ingestion), Arc::new(agent), &config);
        let state = AppState::new(orchestrator, config, CancellationToken::new()).unwrap();
        create_router(Arc::new(state))
    }

    fn ready_ingestion() -> MockIngestionService {
        let mut ingestion = MockIngestionService::new();
        ingestion.expect_submit()
            .returning(|_, _| Ok(test_handle("files/v", FileState::Active)));
        ingestion
    }

    fn answering_agent(content: &'static str) -> MockReasoningAgent {
        let mut agent = MockReasoningAgent::new();
        agent.expect_run().returning(move |_, _| Ok(AgentResponse {
            content: content.to_string(),
            tool_calls: Vec::new(),
            model: "gemini-test".to_string(),
        }));
        agent
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = router(MockIngestionService::new(), MockReasoningAgent::new());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Powered by Gemini"));
        assert!(html.contains("accept=\".mp4,.mov\""));
        assert!(html.contains("Upload a video file to begin analysis."));
    }

    #[tokio::test]
    async fn test_analyze_page_renders_markdown_answer() {
        let app = router(ready_ingestion(), answering_agent("## Ingredients\n- **eggs**\n- flour"));
        let response = app
            .oneshot(post("/analyze", multipart_body(Some(("pasta.mp4", b"data")), "recipe?")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Analysis result"));
        assert!(html.contains("<h2>Ingredients</h2>"));
        assert!(html.contains("<strong>eggs</strong>"));
        assert!(!html.contains("## Ingredients"));
    }

    #[tokio::test]
    async fn test_analyze_page_escapes_raw_html_in_answer() {
        let app = router(ready_ingestion(), answering_agent("Ingredients: <eggs>\n\n<script>alert(1)</script>"));
        let response = app
            .oneshot(post("/analyze", multipart_body(Some(("pasta.mp4", b"data")), "recipe?")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Ingredients: &lt;eggs&gt;"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert(1)"));
    }

    #[tokio::test]
    async fn test_analyze_page_warns_on_empty_query() {
        let mut ingestion = MockIngestionService::new();
        ingestion.expect_submit().never();
        let mut agent = MockReasoningAgent::new();
        agent.expect_run().never();

        let app = router(ingestion, agent);
        let response = app
            .oneshot(post("/analyze", multipart_body(Some(("pasta.mp4", b"data")), "  ")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("Please enter a question or insights from the video."));
    }

    #[tokio::test]
    async fn test_analyze_page_shows_failure() {
        let mut ingestion = MockIngestionService::new();
        ingestion.expect_submit()
            .returning(|_, _| Err(VidlensError::Ingestion("upload refused".into())));

        let app = router(ingestion, MockReasoningAgent::new());
        let response = app
            .oneshot(post("/analyze", multipart_body(Some(("pasta.mp4", b"data")), "recipe?")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response).await;
        assert!(html.contains("An error occurred during analysis : Ingestion failed: upload refused"));
    }

    #[tokio::test]
    async fn test_api_analyze_returns_report() {
        let app = router(ready_ingestion(), answering_agent("Ingredients: eggs\nSteps: boil"));
        let response = app
            .oneshot(post("/api/analyze", multipart_body(Some(("pasta.mp4", b"data")), "recipe?")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let report: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(report["content"], "Ingredients: eggs\nSteps: boil");
        assert_eq!(report["file_name"], "pasta.mp4");
    }

    #[tokio::test]
    async fn test_api_analyze_requires_video() {
        let app = router(MockIngestionService::new(), MockReasoningAgent::new());
        let response = app
            .oneshot(post("/api/analyze", multipart_body(None, "recipe?")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&VidlensError::EmptyQuery), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&VidlensError::IngestionTimeout { attempts: 1 }), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(&VidlensError::Agent("x".into())), StatusCode::BAD_GATEWAY);
    }
}
