//! HTTP surface: `GET /api/search` and `GET /health`.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use sift_common::{ContentResult, SiftError};
use sift_llm::structurer::QueryStructurer;
use sift_web::{Pipeline, PipelineReport};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub structurer: Arc<dyn QueryStructurer>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(search_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: Option<String>,
}

/// Error body is always `{"error": <message>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// GET /api/search?query=...
///
/// Structures the question into themes, then searches and extracts. Any
/// run-level failure resets the browsing session so the next request
/// starts from a fresh one.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ContentResult>>, ApiError> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing query parameter"))?;

    match run_search(&state, query).await {
        Ok(report) => {
            if !report.skipped.is_empty() {
                warn!(target: "sift.http", skipped = report.skipped.len(), "search finished with skipped work");
            }
            Ok(Json(report.results))
        }
        Err(e) => {
            error!(target: "sift.http", %query, error = %e, "search failed");
            state.pipeline.reset().await;
            Err(ApiError::internal(e.to_string()))
        }
    }
}

async fn run_search(state: &AppState, query: &str) -> Result<PipelineReport, SiftError> {
    let structured = state.structurer.structure(query).await?;
    info!(
        target: "sift.http",
        themes = structured.themes.len(),
        lang = %structured.config.language_code,
        "query structured"
    );
    state.pipeline.initialize().await?;
    state
        .pipeline
        .run(&structured.themes, &structured.config)
        .await
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
