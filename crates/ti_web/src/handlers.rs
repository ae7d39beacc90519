use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use ti_core::storage::{ArticleStore, ArtifactStore, ProfileStore, ScheduleStore};
use ti_core::{Error, ScheduledTask, SearchProfile};
use ti_report::{BodyFormat, EmailAttachment};
use ti_trend::detector::{analyze_trends, TrendParams};
use tracing::warn;

use crate::AppState;

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Config(_) => StatusCode::BAD_REQUEST,
            Error::Crawl(_) | Error::Inference(_) | Error::Mail(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(error = %self.0, "request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{what} not found") })),
    )
        .into_response()
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn list_articles(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let articles = state.store.all_articles().await?;
    Ok(Json(articles).into_response())
}

#[derive(Deserialize)]
pub struct CrawlRequest {
    pub keyword: String,
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_pages")]
    pub pages_per_day: u32,
}

fn default_days() -> u32 {
    15
}

fn default_pages() -> u32 {
    3
}

#[derive(Serialize)]
pub struct CrawlResponse {
    pub stored: usize,
}

pub async fn crawl(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CrawlRequest>,
) -> Result<Json<CrawlResponse>, ApiError> {
    let stored = state
        .crawler
        .crawl_range(&req.keyword, req.days, req.pages_per_day)
        .await?;
    Ok(Json(CrawlResponse { stored }))
}

#[derive(Deserialize, Default)]
pub struct AnalyzeRequest {
    pub recent_window_days: Option<i64>,
    pub total_window_days: Option<i64>,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Option<Json<AnalyzeRequest>>,
) -> Result<Response, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let defaults = TrendParams::default();
    let params = TrendParams {
        recent_window_days: req.recent_window_days.unwrap_or(defaults.recent_window_days),
        total_window_days: req.total_window_days.unwrap_or(defaults.total_window_days),
        ..defaults
    };

    let articles = state.store.all_articles().await?;
    let observations = analyze_trends(
        &articles,
        &state.extractor,
        &params,
        state.clock.as_ref(),
    );
    Ok(Json(observations).into_response())
}

#[derive(Deserialize)]
pub struct ReportRequest {
    pub profile: String,
    #[serde(default)]
    pub email: Vec<String>,
}

pub async fn report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReportRequest>,
) -> Result<Response, ApiError> {
    let profiles = state.store.list_profiles().await?;
    let Some(profile) = profiles.into_iter().find(|p| p.name == req.profile) else {
        return Ok(not_found("profile"));
    };

    let report = state.pipeline.run(&profile).await?;

    if !req.email.is_empty() {
        if let Some(mailer) = &state.mailer {
            let now = state.clock.now();
            let attachments = vec![EmailAttachment {
                data: report.formatted.clone().into_bytes(),
                filename: ti_report::report_filename("트렌드_보고서", "txt", now),
                mime_type: "text/plain".to_string(),
            }];
            if let Err(e) = mailer
                .send_report(
                    &req.email,
                    &format!("뉴스 트렌드 분석 보고서 ({})", now.format("%Y-%m-%d")),
                    &report.formatted,
                    BodyFormat::Markdown,
                    attachments,
                )
                .await
            {
                warn!(error = %e, "report email failed");
            }
        } else {
            warn!("email requested but no smtp configuration");
        }
    }

    Ok(Json(report).into_response())
}

pub async fn list_profiles(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let profiles = state.store.list_profiles().await?;
    Ok(Json(profiles).into_response())
}

pub async fn save_profile(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<SearchProfile>,
) -> Result<Response, ApiError> {
    state.store.save_profile(&profile).await?;
    Ok(Json(profile).into_response())
}

pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_profile(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_schedule(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match state.store.schedule().await? {
        Some(task) => Ok(Json(task).into_response()),
        None => Ok(not_found("schedule")),
    }
}

pub async fn put_schedule(
    State(state): State<Arc<AppState>>,
    Json(task): Json<ScheduledTask>,
) -> Result<Response, ApiError> {
    state.store.set_schedule(&task).await?;
    Ok(Json(task).into_response())
}

pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.store.clear_schedule().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_clause(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match state.store.latest_clause().await? {
        Some(text) => Ok(Json(json!({ "text": text })).into_response()),
        None => Ok(not_found("clause")),
    }
}

#[derive(Deserialize)]
pub struct DocumentRequest {
    pub text: String,
}

pub async fn put_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DocumentRequest>,
) -> Result<StatusCode, ApiError> {
    state.store.save_document_text(&req.text).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_document(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match state.store.latest_document_text().await? {
        Some(text) => Ok(Json(json!({ "text": text })).into_response()),
        None => Ok(not_found("document")),
    }
}
