use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::analyzer::MemberScope;

/// Typed configuration for one pipeline instance. Every field has a default, so an
/// empty YAML document (or none at all) yields a working local setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Parent directory for scratch clones.
    pub workspace_dir: PathBuf,
    /// Parent directory for per-job output folders (`repo-<id>/`).
    pub output_dir: PathBuf,
    /// Keep the cloned workspace after the job finishes.
    pub keep_clone: bool,
    pub default_branch: String,
    pub source_extensions: Vec<String>,
    pub clone_timeout_secs: u64,
    pub processing: ProcessingConfig,
    pub ai: AiConfig,
    pub diagram: DiagramConfig,
    pub pdf: PdfConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            keep_clone: false,
            default_branch: "main".to_string(),
            source_extensions: vec!["java".to_string()],
            clone_timeout_secs: 300,
            processing: ProcessingConfig::default(),
            ai: AiConfig::default(),
            diagram: DiagramConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn trace_loaded(&self) {
        info!(
            workspace_dir = %self.workspace_dir.display(),
            output_dir = %self.output_dir.display(),
            ai_enabled = self.ai.enabled,
            ai_base_url = %self.ai.base_url,
            concurrency_limit = self.processing.concurrency_limit,
            keep_clone = self.keep_clone,
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Files per batch. Zero is treated as one.
    pub concurrency_limit: usize,
    /// How many methods per class receive an individual description.
    pub methods_described_per_class: usize,
    /// How many method signatures go into a class-summary prompt.
    pub signatures_in_summary: usize,
    pub member_scope: MemberScope,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            methods_described_per_class: 3,
            signatures_in_summary: 5,
            member_scope: MemberScope::WholeFile,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    /// OpenAI-compatible base URL; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub docker_program: String,
    pub image: String,
    pub probe_timeout_secs: u64,
    pub render_timeout_secs: u64,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            docker_program: "docker".to_string(),
            image: "ghcr.io/plantuml/plantuml".to_string(),
            probe_timeout_secs: 5,
            render_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub enabled: bool,
    pub browser_program: String,
    pub timeout_secs: u64,
    /// Opt-in: fall back to a plain-text PDF when the browser is missing or fails.
    /// Off by default, so a browser failure leaves the document without a PDF.
    pub plain_text_fallback: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            browser_program: "chromium".to_string(),
            timeout_secs: 60,
            plain_text_fallback: false,
        }
    }
}
