use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::contract::DocumentStore;
use crate::error::{FormatParseError, RetrievalError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Completed,
}

/// A finished job's artifacts, held in memory for retrieval by id.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub markdown: String,
    /// `None` when PDF generation failed or was disabled.
    pub pdf_bytes: Option<Vec<u8>>,
    pub pdf_path: Option<PathBuf>,
    pub diagram_image_bytes: Option<Vec<u8>>,
    pub diagram_image_path: Option<PathBuf>,
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub status: DocumentStatus,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            timestamp: doc.timestamp,
            status: doc.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markdown,
    Pdf,
    Png,
}

impl FromStr for DocumentFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(DocumentFormat::Markdown),
            "pdf" => Ok(DocumentFormat::Pdf),
            "png" => Ok(DocumentFormat::Png),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Markdown => "md",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Png => "png",
        };
        f.write_str(name)
    }
}

/// Bytes ready to serve, with the headers a download needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
    /// `attachment` or `inline`.
    pub disposition: &'static str,
}

impl Artifact {
    pub fn content_disposition(&self) -> String {
        format!("{}; filename=\"{}\"", self.disposition, self.filename)
    }
}

/// Looks up `id` and extracts the artifact for `format`. A missing document and a
/// missing artifact on an existing document are distinct errors.
pub fn retrieve(
    store: &dyn DocumentStore,
    id: &str,
    format: DocumentFormat,
) -> Result<Artifact, RetrievalError> {
    let doc = store
        .get(id)
        .ok_or_else(|| RetrievalError::NotFound(id.to_string()))?;

    let not_available = || RetrievalError::NotAvailable(format);
    match format {
        DocumentFormat::Markdown => {
            if doc.markdown.is_empty() {
                return Err(not_available());
            }
            Ok(Artifact {
                bytes: doc.markdown.clone().into_bytes(),
                content_type: "text/markdown",
                filename: format!("{}.md", doc.name),
                disposition: "attachment",
            })
        }
        DocumentFormat::Pdf => {
            let bytes = doc.pdf_bytes.clone().ok_or_else(not_available)?;
            Ok(Artifact {
                bytes,
                content_type: "application/pdf",
                filename: format!("{}.pdf", doc.name),
                disposition: "attachment",
            })
        }
        DocumentFormat::Png => {
            let bytes = doc.diagram_image_bytes.clone().ok_or_else(not_available)?;
            Ok(Artifact {
                bytes,
                content_type: "image/png",
                filename: format!("{}-diagram.png", doc.name),
                disposition: "inline",
            })
        }
    }
}

/// Process-lifetime [`DocumentStore`].
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: Mutex<HashMap<String, Arc<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Document>>> {
        // a panic while holding the lock cannot leave a half-written entry
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(&self, document: Document) {
        tracing::debug!(id = %document.id, name = %document.name, "Storing document");
        self.lock().insert(document.id.clone(), Arc::new(document));
    }

    fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.lock().get(id).cloned()
    }

    fn list(&self) -> Vec<DocumentSummary> {
        let mut summaries: Vec<DocumentSummary> = self
            .lock()
            .values()
            .map(|doc| DocumentSummary::from(doc.as_ref()))
            .collect();
        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        summaries
    }
}
