use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use repodoc::server::{create_router, AppState};
use repodoc_core::analyzer::{MemberScope, PatternAnalyzer};
use repodoc_core::config::PipelineConfig;
use repodoc_core::contract::{DocumentStore, MockDiagramRenderer, MockProcessRunner, ProcessOutput};
use repodoc_core::pdf::PdfAssembler;
use repodoc_core::pipeline::Pipeline;
use repodoc_core::processor::FileProcessor;
use repodoc_core::store::{Document, DocumentStatus, InMemoryDocumentStore};

struct TestApp {
    router: Router,
    store: Arc<InMemoryDocumentStore>,
    _root: TempDir,
}

fn app_with_runner(runner: MockProcessRunner) -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        workspace_dir: root.path().join("uploads"),
        output_dir: root.path().join("outputs"),
        ..PipelineConfig::default()
    };
    let processor = FileProcessor::new(
        Arc::new(PatternAnalyzer::new(MemberScope::WholeFile)),
        None,
        config.processing.clone(),
    );
    let store = Arc::new(InMemoryDocumentStore::new());
    let pipeline = Pipeline::new(
        config,
        Arc::new(runner),
        processor,
        Arc::new(MockDiagramRenderer::new()),
        PdfAssembler::new(Vec::new(), "Java API Documentation"),
        store.clone(),
    );
    TestApp {
        router: create_router(AppState {
            pipeline: Arc::new(pipeline),
        }),
        store,
        _root: root,
    }
}

fn app() -> TestApp {
    app_with_runner(MockProcessRunner::new())
}

fn markdown_only_doc(id: &str) -> Document {
    Document {
        id: id.to_string(),
        name: format!("demo_{id}"),
        timestamp: chrono::Utc::now(),
        markdown: "# Java API Documentation\n".to_string(),
        pdf_bytes: None,
        pdf_path: None,
        diagram_image_bytes: None,
        diagram_image_path: None,
        status: DocumentStatus::Completed,
    }
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, _, body) = send(app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let app = app();
    let (status, _, body) = send(app.router, get("/api/docs/nope1234?format=pdf")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "Documentation not found");
}

#[tokio::test]
async fn missing_pdf_is_not_available_rather_than_not_found() {
    let app = app();
    app.store.put(markdown_only_doc("ab12cd34"));

    let (status, _, body) = send(app.router, get("/api/docs/ab12cd34?format=pdf")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json(&body)["error"],
        "PDF not available. Generate documentation first."
    );
}

#[tokio::test]
async fn markdown_is_served_as_attachment() {
    let app = app();
    app.store.put(markdown_only_doc("ab12cd34"));

    let (status, headers, body) = send(app.router, get("/api/docs/ab12cd34?format=md")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/markdown");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"demo_ab12cd34.md\""
    );
    assert_eq!(body, b"# Java API Documentation\n");
}

#[tokio::test]
async fn invalid_format_is_rejected() {
    let app = app();
    app.store.put(markdown_only_doc("ab12cd34"));

    let (status, _, body) = send(app.router, get("/api/docs/ab12cd34?format=docx")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid format"));
}

#[tokio::test]
async fn history_lists_stored_documents() {
    let app = app();
    app.store.put(markdown_only_doc("ab12cd34"));

    let (status, _, body) = send(app.router, get("/api/docs")).await;
    assert_eq!(status, StatusCode::OK);
    let docs = json(&body)["docs"].as_array().unwrap().clone();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["id"], "ab12cd34");
    assert_eq!(docs[0]["name"], "demo_ab12cd34");
    assert_eq!(docs[0]["status"], "completed");
}

#[tokio::test]
async fn process_without_url_is_bad_request() {
    let app = app();
    let (status, _, body) = send(app.router, post_json("/api/repository/process", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["message"], "repositoryUrl is required");
}

#[tokio::test]
async fn process_with_non_git_url_is_bad_request() {
    let app = app();
    let (status, _, body) = send(
        app.router,
        post_json(
            "/api/repository/process",
            r#"{"repositoryUrl":"https://example.com/not-a-repo"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Invalid repository URL");
}

#[tokio::test]
async fn clone_failure_is_reported_with_phase() {
    let mut runner = MockProcessRunner::new();
    runner.expect_run().returning(|_, _, _| {
        Ok(ProcessOutput {
            stdout: String::new(),
            stderr: "fatal: repository 'https://github.com/acme/missing.git/' not found".into(),
            status: Some(128),
        })
    });
    let app = app_with_runner(runner);

    let (status, _, body) = send(
        app.router.clone(),
        post_json(
            "/api/repository/process",
            r#"{"repositoryUrl":"https://github.com/acme/missing.git","branch":"dev"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(&body);
    assert_eq!(body["success"], false);
    assert_eq!(body["phase"], "clone");
    assert_eq!(body["message"], "Failed during clone phase");
    assert!(body["error"].as_str().unwrap().contains("not found"));
    assert!(app.store.list().is_empty());
}

#[tokio::test]
async fn unknown_job_status_is_not_found() {
    let app = app();
    let (status, _, _) = send(app.router, get("/api/repository/status/unknown0")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
