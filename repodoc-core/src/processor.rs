//! Bounded fan-out of analysis and enrichment over a list of source files.
//!
//! Files are processed in batches of `concurrency_limit`. Inside a batch every file runs
//! as its own tokio task; the whole batch is awaited before the next one starts, so at
//! most `concurrency_limit` files (and their enrichment calls) are in flight at once.
//! Per-file failures are counted and logged, never propagated.

use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ProcessingConfig;
use crate::contract::{Analyzer, Enricher};
use crate::error::FileError;
use crate::model::{Enrichment, EnrichmentMap, StructuralUnit};

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessingReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub unit: StructuralUnit,
    pub enrichments: EnrichmentMap,
    pub failures: Vec<FileFailure>,
}

impl ProcessingReport {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

#[derive(Clone)]
pub struct FileProcessor {
    analyzer: Arc<dyn Analyzer>,
    enricher: Option<Arc<dyn Enricher>>,
    options: ProcessingConfig,
}

impl FileProcessor {
    /// `enricher: None` disables enrichment entirely.
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        enricher: Option<Arc<dyn Enricher>>,
        options: ProcessingConfig,
    ) -> Self {
        Self {
            analyzer,
            enricher,
            options,
        }
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.enricher.is_some()
    }

    pub async fn process_all(&self, files: &[PathBuf]) -> ProcessingReport {
        let limit = self.options.concurrency_limit.max(1);
        tracing::info!(files = files.len(), limit, "Starting parallel file processing");

        let mut units = Vec::new();
        let mut report = ProcessingReport::default();

        for batch in files.chunks(limit) {
            let handles: Vec<_> = batch
                .iter()
                .map(|path| {
                    let this = self.clone();
                    let path = path.clone();
                    tokio::spawn(async move { this.process_file(&path).await })
                })
                .collect();

            for (path, joined) in batch.iter().zip(join_all(handles).await) {
                let outcome = joined.unwrap_or_else(|e| {
                    Err(FileError::Aborted {
                        path: path.clone(),
                        reason: e.to_string(),
                    })
                });
                match outcome {
                    Ok((unit, enrichments)) => {
                        report.success_count += 1;
                        units.push(unit);
                        report.enrichments.merge(enrichments);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, path = %path.display(), "File processing failed");
                        report.failure_count += 1;
                        report.failures.push(FileFailure {
                            path: path.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        report.unit = StructuralUnit::aggregate(units);
        tracing::info!(
            succeeded = report.success_count,
            failed = report.failure_count,
            classes = report.unit.classes.len(),
            interfaces = report.unit.interfaces.len(),
            "Parallel file processing finished"
        );
        report
    }

    /// Read, analyze and (optionally) enrich a single file.
    pub async fn process_file(
        &self,
        path: &Path,
    ) -> Result<(StructuralUnit, EnrichmentMap), FileError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FileError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let unit = self.analyzer.analyze(&source);
        tracing::debug!(
            path = %path.display(),
            classes = unit.classes.len(),
            interfaces = unit.interfaces.len(),
            "Analyzed file"
        );

        let enrichments = match &self.enricher {
            Some(enricher) => self.enrich_unit(enricher.as_ref(), &unit).await,
            None => EnrichmentMap::new(),
        };
        Ok((unit, enrichments))
    }

    async fn enrich_unit(&self, enricher: &dyn Enricher, unit: &StructuralUnit) -> EnrichmentMap {
        let mut map = EnrichmentMap::new();

        for class in &unit.classes {
            let signatures: Vec<String> = class
                .methods
                .iter()
                .take(self.options.signatures_in_summary)
                .map(|m| m.signature())
                .collect();
            let summary = enricher.summarize_class(&class.name, &signatures).await;
            map.insert(class.name.clone(), summary);

            for method in class.methods.iter().take(self.options.methods_described_per_class) {
                let symbol = format!("{}.{}", class.name, method.name);
                let context = format!(
                    "Class: {}, Method returns {}",
                    class.name, method.return_type
                );
                let description = enricher.describe_symbol(&symbol, &context).await;
                map.insert(symbol, first_line_only(description));
            }
        }

        for interface in &unit.interfaces {
            let signatures: Vec<String> = interface
                .methods
                .iter()
                .take(self.options.signatures_in_summary)
                .map(|m| m.signature())
                .collect();
            let summary = enricher.summarize_class(&interface.name, &signatures).await;
            map.insert(interface.name.clone(), summary);
        }

        map
    }
}

fn first_line_only(enrichment: Enrichment) -> Enrichment {
    let line = enrichment.first_line().to_string();
    match enrichment {
        Enrichment::Generated(_) => Enrichment::Generated(line),
        Enrichment::Fallback(_) => Enrichment::Fallback(line),
    }
}
