/// `load_config` module: reads the optional YAML config file and layers environment
/// overrides on top, producing the [`CliConfig`] the CLI and server run with.
///
/// This is the only place where untrusted YAML is parsed. Every field has a default, so a
/// missing file section (or no file at all) still yields a runnable configuration.
///
/// # Environment overrides
/// Applied after the file, so they always win:
/// - `AI_MODEL_URL`, `AI_MODEL_NAME`: enrichment endpoint and model
/// - `KEEP_CLONE`: `true`/`1` keeps cloned repositories on disk
/// - `REPODOC_WORKSPACE_DIR`, `REPODOC_OUTPUT_DIR`: scratch and output roots
/// - `PORT`: HTTP listen port
///
/// # Errors
/// All errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::Result;
use repodoc_core::config::PipelineConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub pipeline: PipelineConfig,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Loads `path` when given, otherwise starts from defaults, then applies environment
/// overrides.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let mut config = match path {
        Some(path_ref) => read_file(path_ref)?,
        None => {
            info!("No config file given, using defaults");
            CliConfig::default()
        }
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn read_file(path_ref: &Path) -> Result<CliConfig> {
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file deserializes to YAML null, not to an empty mapping.
    if config_content.trim().is_empty() {
        return Ok(CliConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

fn apply_env_overrides(config: &mut CliConfig) -> Result<()> {
    if let Some(url) = env_value("AI_MODEL_URL") {
        config.pipeline.ai.base_url = url;
    }
    if let Some(model) = env_value("AI_MODEL_NAME") {
        config.pipeline.ai.model = model;
    }
    if let Some(keep) = env_value("KEEP_CLONE") {
        config.pipeline.keep_clone = matches!(keep.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Some(dir) = env_value("REPODOC_WORKSPACE_DIR") {
        config.pipeline.workspace_dir = PathBuf::from(dir);
    }
    if let Some(dir) = env_value("REPODOC_OUTPUT_DIR") {
        config.pipeline.output_dir = PathBuf::from(dir);
    }
    if let Some(port) = env_value("PORT") {
        config.server.port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid PORT value {port:?}: {e}"))?;
    }
    Ok(())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
