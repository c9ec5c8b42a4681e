//! Job orchestration: clone → process → store, for one repository per job.
//!
//! # Responsibilities
//! - Assigns each job an id (first 8 hex characters of a v4 UUID) and tracks its phase
//!   and status in a process-lifetime registry.
//! - Runs the stages in order: acquisition, source walk, parallel analysis/enrichment,
//!   diagram generation and rendering, Markdown and PDF assembly.
//! - Writes per-job outputs to `<output_dir>/repo-<id>/` and stores the finished
//!   [`Document`] for retrieval.
//!
//! # Failure model
//! Only three things end a job: a failed clone (`clone` phase), a repository with no
//! source files, and an output directory that cannot be written (`process` phase).
//! Enrichment, diagram rendering and PDF failures are recorded as warnings on an
//! otherwise successful job.
//!
//! # Cleanup
//! The cloned workspace is removed when the job ends, whatever the outcome, unless
//! `keep_clone` is set.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::acquire::{clone_repository, CloneRequest};
use crate::analyzer::PatternAnalyzer;
use crate::config::PipelineConfig;
use crate::contract::{DiagramRenderer, DocumentStore, Enricher, ProcessRunner};
use crate::diagram::generate_diagram;
use crate::document::{to_markdown, MarkdownOptions};
use crate::enrich::LlmEnricher;
use crate::error::{EnrichError, RenderError};
use crate::pdf::PdfAssembler;
use crate::process::TokioProcessRunner;
use crate::processor::FileProcessor;
use crate::render::{render_to_image, PlantUmlRenderer, DIAGRAM_SOURCE_FILE};
use crate::store::{Document, DocumentStatus, InMemoryDocumentStore};
use crate::walker::find_source_files;

pub const MARKDOWN_FILE: &str = "documentation.md";
pub const AI_METADATA_FILE: &str = "ai-metadata.json";
pub const PDF_FILE: &str = "documentation.pdf";
pub const NO_SOURCE_FILES: &str = "No source files found in repository";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub repository_url: String,
    /// Falls back to the configured default branch.
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Clone,
    Process,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            JobPhase::Clone => "clone",
            JobPhase::Process => "process",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryJob {
    pub id: String,
    pub source_url: String,
    pub branch: String,
    pub phase: JobPhase,
    pub status: JobStatus,
    pub success: bool,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub files_found: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub classes_found: usize,
    pub interfaces_found: usize,
    /// Successful enrichment calls only; fallbacks are not counted.
    pub ai_enrichments: usize,
    pub ai_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationPaths {
    pub markdown_path: PathBuf,
    pub puml_path: PathBuf,
    pub ai_metadata_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram_image_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram_rendering_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub id: String,
    pub name: String,
    pub statistics: Statistics,
    pub documentation: DocumentationPaths,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct JobFailure {
    pub id: String,
    pub phase: JobPhase,
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum JobOutcome {
    Completed(JobReport),
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn id(&self) -> &str {
        match self {
            JobOutcome::Completed(report) => &report.id,
            JobOutcome::Failed(failure) => &failure.id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

/// `https://host/org/demo.git` → `demo`.
pub fn repository_name(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        "repository".to_string()
    } else {
        name.to_string()
    }
}

pub fn new_job_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub struct Pipeline {
    config: PipelineConfig,
    runner: Arc<dyn ProcessRunner>,
    processor: FileProcessor,
    renderer: Arc<dyn DiagramRenderer>,
    pdf: PdfAssembler,
    store: Arc<dyn DocumentStore>,
    jobs: Mutex<HashMap<String, RepositoryJob>>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        runner: Arc<dyn ProcessRunner>,
        processor: FileProcessor,
        renderer: Arc<dyn DiagramRenderer>,
        pdf: PdfAssembler,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            config,
            runner,
            processor,
            renderer,
            pdf,
            store,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Production wiring: tokio processes, the pattern analyzer, the HTTP enricher (when
    /// enabled), the docker renderer, browser PDF output and an in-memory store.
    pub fn from_config(config: PipelineConfig) -> Result<Self, EnrichError> {
        config.trace_loaded();
        let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner::new());
        let enricher: Option<Arc<dyn Enricher>> = if config.ai.enabled {
            Some(Arc::new(LlmEnricher::new(&config.ai)?))
        } else {
            None
        };
        let processor = FileProcessor::new(
            Arc::new(PatternAnalyzer::new(config.processing.member_scope)),
            enricher,
            config.processing.clone(),
        );
        let renderer = Arc::new(PlantUmlRenderer::new(runner.clone(), config.diagram.clone()));
        let pdf = PdfAssembler::from_config(
            &config.pdf,
            runner.clone(),
            &MarkdownOptions::default().title,
        );
        Ok(Self::new(
            config,
            runner,
            processor,
            renderer,
            pdf,
            Arc::new(InMemoryDocumentStore::new()),
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn job(&self, id: &str) -> Option<RepositoryJob> {
        self.registry().get(id).cloned()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, RepositoryJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update_job(&self, id: &str, update: impl FnOnce(&mut RepositoryJob)) {
        if let Some(job) = self.registry().get_mut(id) {
            update(job);
        }
    }

    pub async fn run(&self, request: JobRequest) -> JobOutcome {
        let id = new_job_id();
        let branch = request
            .branch
            .clone()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| self.config.default_branch.clone());

        info!(job_id = %id, repo_url = %request.repository_url, branch = %branch, "[PIPELINE] Starting job");
        self.registry().insert(
            id.clone(),
            RepositoryJob {
                id: id.clone(),
                source_url: request.repository_url.clone(),
                branch: branch.clone(),
                phase: JobPhase::Clone,
                status: JobStatus::Running,
                success: false,
                error_message: None,
                started_at: Utc::now(),
                finished_at: None,
            },
        );

        let clone_request = CloneRequest {
            url: request.repository_url.clone(),
            branch,
        };
        let clone =
            match clone_repository(self.runner.as_ref(), &clone_request, &id, &self.config).await {
                Ok(clone) => clone,
                Err(e) => {
                    error!(job_id = %id, error = %e, "[PIPELINE][ERROR] Clone failed");
                    return self.fail(&id, JobPhase::Clone, e.to_string());
                }
            };

        self.update_job(&id, |job| job.phase = JobPhase::Process);
        let result = self
            .process(&id, &request.repository_url, clone.path())
            .await;

        if self.config.keep_clone {
            let kept = clone.retain();
            info!(job_id = %id, path = %kept.display(), "[PIPELINE] Keeping cloned workspace");
        } else {
            drop(clone);
            info!(job_id = %id, "[PIPELINE] Removed cloned workspace");
        }

        match result {
            Ok(report) => {
                info!(
                    job_id = %id,
                    files = report.statistics.files_processed,
                    classes = report.statistics.classes_found,
                    warnings = report.warnings.len(),
                    "[PIPELINE] Job completed"
                );
                self.update_job(&id, |job| {
                    job.status = JobStatus::Completed;
                    job.success = true;
                    job.finished_at = Some(Utc::now());
                });
                JobOutcome::Completed(report)
            }
            Err(message) => {
                error!(job_id = %id, error = %message, "[PIPELINE][ERROR] Processing failed");
                self.fail(&id, JobPhase::Process, message)
            }
        }
    }

    fn fail(&self, id: &str, phase: JobPhase, error: String) -> JobOutcome {
        self.update_job(id, |job| {
            job.phase = phase;
            job.status = JobStatus::Failed;
            job.success = false;
            job.error_message = Some(error.clone());
            job.finished_at = Some(Utc::now());
        });
        JobOutcome::Failed(JobFailure {
            id: id.to_string(),
            phase,
            error,
        })
    }

    /// Everything after the clone. `Err` carries the message of a fatal failure.
    async fn process(&self, id: &str, repo_url: &str, root: &Path) -> Result<JobReport, String> {
        let files = find_source_files(root, &self.config.source_extensions);
        info!(job_id = %id, files = files.len(), "[PIPELINE] Source files discovered");
        if files.is_empty() {
            return Err(NO_SOURCE_FILES.to_string());
        }

        let report = self.processor.process_all(&files).await;
        let mut warnings: Vec<String> = report
            .failures
            .iter()
            .map(|f| format!("Failed to process {}: {}", f.path.display(), f.error))
            .collect();

        let out_dir = self.config.output_dir.join(format!("repo-{id}"));
        std::fs::create_dir_all(&out_dir).map_err(|e| {
            format!(
                "Failed to create output directory {}: {e}",
                out_dir.display()
            )
        })?;

        // diagram
        let puml = generate_diagram(&report.unit);
        let mut diagram_rendering_error = None;
        let diagram_image_path =
            match render_to_image(self.renderer.as_ref(), &puml, &out_dir).await {
                Ok(path) => Some(path),
                Err(e) => {
                    let message = match &e {
                        RenderError::Unavailable => {
                            "Docker not available for diagram rendering".to_string()
                        }
                        other => other.to_string(),
                    };
                    warn!(job_id = %id, error = %message, "[PIPELINE] Continuing without diagram image");
                    warnings.push(message.clone());
                    diagram_rendering_error = Some(message);
                    None
                }
            };

        // markdown
        let markdown = to_markdown(
            &report.unit,
            &report.enrichments,
            diagram_image_path.as_deref(),
            &MarkdownOptions::default(),
        );
        let markdown_path = out_dir.join(MARKDOWN_FILE);
        std::fs::write(&markdown_path, &markdown).map_err(|e| {
            format!(
                "Failed to write documentation to {}: {e}",
                markdown_path.display()
            )
        })?;

        // enrichment metadata
        let ai_enabled = self.processor.enrichment_enabled();
        let ai_enrichments = report.enrichments.generated_count();
        let ai_metadata_path = out_dir.join(AI_METADATA_FILE);
        let metadata = serde_json::json!({
            "aiEnabled": ai_enabled,
            "descriptionsGenerated": ai_enrichments,
            "descriptions": report.enrichments.texts(),
        });
        let written = serde_json::to_string_pretty(&metadata)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&ai_metadata_path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!(job_id = %id, error = %e, "[PIPELINE] Failed to write AI metadata");
            warnings.push(format!("Failed to write AI metadata: {e}"));
        }

        // pdf
        let pdf_bytes = self.pdf.to_pdf(&markdown, &out_dir).await;
        let mut pdf_path = None;
        match &pdf_bytes {
            Some(bytes) => {
                let path = out_dir.join(PDF_FILE);
                match std::fs::write(&path, bytes) {
                    Ok(()) => pdf_path = Some(path),
                    Err(e) => {
                        warn!(job_id = %id, error = %e, "[PIPELINE] Failed to save PDF to disk");
                        warnings.push(format!("Failed to save PDF: {e}"));
                    }
                }
            }
            None => warnings.push("PDF not generated".to_string()),
        }

        let diagram_image_bytes = diagram_image_path
            .as_deref()
            .and_then(|path| match std::fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(job_id = %id, error = %e, "[PIPELINE] Failed to load diagram image");
                    None
                }
            });

        let name = format!("{}_{id}", repository_name(repo_url));
        self.store.put(Document {
            id: id.to_string(),
            name: name.clone(),
            timestamp: Utc::now(),
            markdown,
            pdf_bytes,
            pdf_path: pdf_path.clone(),
            diagram_image_bytes,
            diagram_image_path: diagram_image_path.clone(),
            status: DocumentStatus::Completed,
        });
        info!(job_id = %id, name = %name, "[PIPELINE] Documentation stored");

        Ok(JobReport {
            id: id.to_string(),
            name,
            statistics: Statistics {
                files_found: files.len(),
                files_processed: report.success_count,
                files_failed: report.failure_count,
                classes_found: report.unit.classes.len(),
                interfaces_found: report.unit.interfaces.len(),
                ai_enrichments,
                ai_enabled,
            },
            documentation: DocumentationPaths {
                markdown_path,
                puml_path: out_dir.join(DIAGRAM_SOURCE_FILE),
                ai_metadata_path,
                diagram_image_path,
                pdf_path,
                diagram_rendering_error,
            },
            warnings,
        })
    }
}
