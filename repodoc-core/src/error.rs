//! Error types for the pipeline stages.
//!
//! Only [`CloneError`] (and the zero-files condition, reported by the orchestrator) ever
//! ends a job. Every other error here is caught where it happens and turned into a value:
//! a fallback text, a missing artifact, or a skipped file.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to run an external program through a [`crate::contract::ProcessRunner`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

#[derive(Debug, Error)]
pub enum CloneError {
    #[error("failed to prepare clone workspace: {0}")]
    Workspace(#[from] std::io::Error),
    #[error("failed to execute git: {0}")]
    Launch(String),
    #[error("git clone timed out after {} seconds", .0.as_secs())]
    TimedOut(Duration),
    #[error("git clone failed (exit code {code:?}): {stderr}")]
    Git { code: Option<i32>, stderr: String },
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("processing task for {path} aborted: {reason}")]
    Aborted { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("request to text-generation endpoint failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("text-generation endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("text-generation response carried no content")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("diagram renderer is not available")]
    Unavailable,
    #[error("diagram I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("renderer exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("rendered image was not created at {0}")]
    MissingOutput(PathBuf),
}

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("browser exited with code {code:?}: {stderr}")]
    Browser { code: Option<i32>, stderr: String },
    #[error("PDF output was empty")]
    EmptyOutput,
}

/// Why a stored document could not be served in the requested format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("Documentation not found")]
    NotFound(String),
    #[error("{}", not_available_message(.0))]
    NotAvailable(crate::store::DocumentFormat),
}

fn not_available_message(format: &crate::store::DocumentFormat) -> &'static str {
    use crate::store::DocumentFormat;
    match format {
        DocumentFormat::Pdf => "PDF not available. Generate documentation first.",
        DocumentFormat::Markdown => "Markdown not available",
        DocumentFormat::Png => "Diagram image not available",
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid format `{0}`. Use \"pdf\", \"md\", or \"png\"")]
pub struct FormatParseError(pub String);
