//! # contract: capability seams of the documentation pipeline
//!
//! Every external effect the pipeline depends on sits behind one of the traits in this
//! module, so the orchestrator can be driven by real implementations in production and by
//! `mockall` mocks in tests.
//!
//! ## Traits
//! - [`ProcessRunner`]: runs an external program with a hard timeout (git, docker, chromium).
//! - [`Analyzer`]: turns source text into a [`StructuralUnit`]. Pure and total.
//! - [`Enricher`]: produces prose for classes and symbols. Never fails; degrades to
//!   fallback text instead.
//! - [`DiagramRenderer`]: turns a `.puml` file into an image.
//! - [`PdfRenderer`]: prints an HTML page to PDF bytes.
//! - [`DocumentStore`]: keyed, process-lifetime storage for finished documents.
//!
//! ## Mocking & Testing
//! - Traits are annotated for `mockall`; the generated `Mock*` types are exported when the
//!   `test-export-mocks` feature is on (it is by default) so integration tests and the
//!   binary crate can use them.
//!
//! ## Error Handling
//! - Only the process and rendering seams return `Result`. Enrichment and analysis
//!   encode their failure modes in the returned value.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{PdfError, RenderError, RunError};
use crate::model::{Enrichment, StructuralUnit};
use crate::store::{Document, DocumentSummary};

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external programs. Implementations must kill the child when `timeout` elapses.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, RunError>;
}

/// Static structural extraction over one source file.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, source: &str) -> StructuralUnit;
}

/// Natural-language enrichment of the structural model.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Enricher: Send + Sync {
    /// One-sentence summary of a class or interface, given some of its method signatures.
    async fn summarize_class(&self, name: &str, method_signatures: &[String]) -> Enrichment;

    /// Short description of a symbol such as `UserService.addUser`.
    async fn describe_symbol(&self, symbol: &str, context: &str) -> Enrichment;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Cheap probe; `false` means rendering should not be attempted.
    async fn is_available(&self) -> bool;

    /// Renders `source` (a `.puml` file) and returns the path of the produced image.
    async fn render_file(&self, source: &Path) -> Result<PathBuf, RenderError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Prints a document to PDF. `html` is the styled page produced from `markdown`;
    /// renderers use whichever form they can lay out. `work_dir` is the directory relative
    /// resources (the diagram image) resolve against.
    async fn render(&self, markdown: &str, html: &str, work_dir: &Path)
        -> Result<Vec<u8>, PdfError>;
}

/// Keyed storage for generated documents. Safe for concurrent use by many jobs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait DocumentStore: Send + Sync {
    fn put(&self, document: Document);
    fn get(&self, id: &str) -> Option<Arc<Document>>;
    /// Summaries of every stored document, newest first.
    fn list(&self) -> Vec<DocumentSummary>;
}
