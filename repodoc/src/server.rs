//! HTTP routes and handlers for the repodoc API.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use repodoc_core::error::RetrievalError;
use repodoc_core::pipeline::{JobOutcome, JobRequest, Pipeline};
use repodoc_core::store::{retrieve, DocumentFormat};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/repository/process", post(process_repository))
        .route("/api/repository/status/:id", get(job_status))
        .route("/api/docs", get(list_docs))
        .route("/api/docs/:id", get(get_doc))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "repodoc"
    }))
}

// =============================================================================
// Repository processing
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessBody {
    repository_url: Option<String>,
    branch: Option<String>,
}

/// Every Git hosting URL we accept mentions `git` somewhere (`github.com`, `.git`,
/// `gitlab`, `git@`).
fn looks_like_git_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains("git")
}

async fn process_repository(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ProcessBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid request body",
                    "message": rejection.body_text(),
                })),
            )
                .into_response()
        }
    };

    let Some(url) = body.repository_url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Missing required field",
                "message": "repositoryUrl is required",
            })),
        )
            .into_response();
    };
    if !looks_like_git_url(&url) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid repository URL",
                "message": "Must be a valid Git repository URL",
            })),
        )
            .into_response();
    }

    tracing::info!(repo_url = %url, "[API] Repository processing request");
    let outcome = state
        .pipeline
        .run(JobRequest {
            repository_url: url,
            branch: body.branch,
        })
        .await;

    match outcome {
        JobOutcome::Completed(report) => Json(json!({
            "success": true,
            "id": report.id,
            "message": "Repository processed successfully",
            "statistics": report.statistics,
            "documentation": report.documentation,
            "warnings": report.warnings,
        }))
        .into_response(),
        JobOutcome::Failed(failure) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": failure.error,
                "phase": failure.phase,
                "message": format!("Failed during {} phase", failure.phase),
            })),
        )
            .into_response(),
    }
}

async fn job_status(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.pipeline.job(&id) {
        Some(job) => Json(job).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Job not found"),
    }
}

// =============================================================================
// Documentation retrieval
// =============================================================================

async fn list_docs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "docs": state.pipeline.store().list() }))
}

#[derive(Debug, Deserialize)]
struct DocsQuery {
    format: Option<String>,
}

async fn get_doc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<DocsQuery>,
) -> Response {
    let store = state.pipeline.store();
    if store.get(&id).is_none() {
        return error_response(StatusCode::NOT_FOUND, RetrievalError::NotFound(id));
    }

    let format = match params.format.unwrap_or_default().parse::<DocumentFormat>() {
        Ok(format) => format,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match retrieve(store.as_ref(), &id, format) {
        Ok(artifact) => (
            [
                (header::CONTENT_TYPE, artifact.content_type.to_string()),
                (header::CONTENT_DISPOSITION, artifact.content_disposition()),
            ],
            artifact.bytes,
        )
            .into_response(),
        Err(e @ RetrievalError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, e),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}
