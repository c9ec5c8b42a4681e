/// # repodoc CLI Interface (Module)
///
/// Command parsing and entrypoints for the `repodoc` binary. All pipeline logic lives in
/// `repodoc-core`; this module only maps arguments onto a [`CliConfig`], runs a job or
/// starts the HTTP server, and reports the result.
///
/// - For command-line users: run `repodoc --help`.
/// - For programmatic and integration use: call [`run`] with a constructed [`Cli`].
use crate::load_config::{load_config, CliConfig};
use crate::server;
use anyhow::Result;
use clap::{Parser, Subcommand};
use repodoc_core::pipeline::{JobOutcome, JobReport, JobRequest, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for repodoc: clone a Git repository and generate its API documentation.
#[derive(Parser)]
#[clap(
    name = "repodoc",
    version,
    about = "Generate class diagrams and API documentation from a Git repository"
)]
pub struct Cli {
    /// Path to an optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone a repository and write its documentation to the output directory
    Process {
        /// Git URL of the repository
        url: String,
        /// Branch to clone (defaults to the configured default branch)
        #[clap(long)]
        branch: Option<String>,
        /// Skip language-model enrichment
        #[clap(long)]
        no_ai: bool,
        /// Keep the cloned repository on disk after the run
        #[clap(long)]
        keep_clone: bool,
    },
    /// Serve the HTTP API
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[clap(long)]
        port: Option<u16>,
    },
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Process {
            url,
            branch,
            no_ai,
            keep_clone,
        } => {
            if no_ai {
                config.pipeline.ai.enabled = false;
            }
            if keep_clone {
                config.pipeline.keep_clone = true;
            }
            process(config, url, branch).await
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
    }
}

async fn process(config: CliConfig, url: String, branch: Option<String>) -> Result<()> {
    tracing::info!(command = "process", repo_url = %url, "Starting documentation run");
    let pipeline = Pipeline::from_config(config.pipeline)?;

    let outcome = pipeline
        .run(JobRequest {
            repository_url: url,
            branch,
        })
        .await;

    match outcome {
        JobOutcome::Completed(report) => {
            tracing::info!(command = "process", id = %report.id, "Documentation run complete");
            print_report(&report);
            Ok(())
        }
        JobOutcome::Failed(failure) => {
            tracing::error!(
                command = "process",
                id = %failure.id,
                phase = %failure.phase,
                error = %failure.error,
                "Documentation run failed"
            );
            Err(anyhow::anyhow!(
                "Failed during {} phase: {}",
                failure.phase,
                failure.error
            ))
        }
    }
}

fn print_report(report: &JobReport) {
    let stats = &report.statistics;
    let docs = &report.documentation;
    println!("Documentation generated for {} (id {})", report.name, report.id);
    println!(
        "  files: {} found, {} processed, {} failed",
        stats.files_found, stats.files_processed, stats.files_failed
    );
    println!(
        "  classes: {}, interfaces: {}",
        stats.classes_found, stats.interfaces_found
    );
    println!(
        "  ai: {} ({} enrichments)",
        if stats.ai_enabled { "enabled" } else { "disabled" },
        stats.ai_enrichments
    );
    println!("  markdown: {}", docs.markdown_path.display());
    println!("  diagram source: {}", docs.puml_path.display());
    println!("  ai metadata: {}", docs.ai_metadata_path.display());
    if let Some(path) = &docs.diagram_image_path {
        println!("  diagram image: {}", path.display());
    }
    if let Some(path) = &docs.pdf_path {
        println!("  pdf: {}", path.display());
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
}

async fn serve(config: CliConfig) -> Result<()> {
    let port = config.server.port;
    let pipeline = Arc::new(Pipeline::from_config(config.pipeline)?);
    let router = server::create_router(server::AppState { pipeline });

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(command = "serve", %addr, "repodoc listening");
    axum::serve(listener, router).await?;
    Ok(())
}
