use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::DiagramConfig;
use crate::contract::{DiagramRenderer, ProcessRunner};
use crate::diagram::save_diagram;
use crate::error::RenderError;

pub const DIAGRAM_SOURCE_FILE: &str = "diagram.puml";

const CONTAINER_WORK_DIR: &str = "/work";

/// Renders PlantUML through the containerised CLI
/// (`docker run --rm -v <dir>:/work <image> -png /work/<file>`). The image lands next to
/// the source with a `.png` extension.
pub struct PlantUmlRenderer {
    runner: Arc<dyn ProcessRunner>,
    config: DiagramConfig,
}

impl PlantUmlRenderer {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: DiagramConfig) -> Self {
        Self { runner, config }
    }

    fn render_args(&self, host_dir: &Path, file_name: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{CONTAINER_WORK_DIR}", host_dir.display()),
            self.config.image.clone(),
            "-png".to_string(),
            format!("{CONTAINER_WORK_DIR}/{file_name}"),
        ]
    }
}

#[async_trait]
impl DiagramRenderer for PlantUmlRenderer {
    async fn is_available(&self) -> bool {
        let probe = self
            .runner
            .run(
                &self.config.docker_program,
                &["--version".to_string()],
                Duration::from_secs(self.config.probe_timeout_secs),
            )
            .await;
        match probe {
            Ok(output) if output.success() => {
                tracing::debug!(version = %output.stdout.trim(), "Docker is available");
                true
            }
            Ok(output) => {
                tracing::warn!(status = ?output.status, "Docker probe failed");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Docker not available");
                false
            }
        }
    }

    async fn render_file(&self, source: &Path) -> Result<PathBuf, RenderError> {
        let source = std::fs::canonicalize(source)?;
        let host_dir = source
            .parent()
            .ok_or_else(|| RenderError::MissingOutput(source.clone()))?
            .to_path_buf();
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image_path = source.with_extension("png");

        tracing::info!(
            source = %source.display(),
            image = %self.config.image,
            "Rendering PlantUML diagram"
        );
        let output = self
            .runner
            .run(
                &self.config.docker_program,
                &self.render_args(&host_dir, &file_name),
                Duration::from_secs(self.config.render_timeout_secs),
            )
            .await?;
        if !output.success() {
            return Err(RenderError::Failed {
                code: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        if !image_path.is_file() {
            return Err(RenderError::MissingOutput(image_path));
        }
        tracing::info!(path = %image_path.display(), "Diagram image rendered");
        Ok(image_path)
    }
}

/// Writes `diagram_text` to `<output_dir>/diagram.puml`, then renders it if the renderer
/// is available. The source file is written even when rendering is impossible.
pub async fn render_to_image(
    renderer: &dyn DiagramRenderer,
    diagram_text: &str,
    output_dir: &Path,
) -> Result<PathBuf, RenderError> {
    let source = output_dir.join(DIAGRAM_SOURCE_FILE);
    save_diagram(diagram_text, &source)?;
    if !renderer.is_available().await {
        return Err(RenderError::Unavailable);
    }
    renderer.render_file(&source).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockDiagramRenderer, MockProcessRunner, ProcessOutput};
    use crate::error::RunError;
    use tempfile::tempdir;

    fn ok(status: i32) -> ProcessOutput {
        ProcessOutput {
            stdout: "Docker version 27.0.1".into(),
            stderr: String::new(),
            status: Some(status),
        }
    }

    #[tokio::test]
    async fn probe_reports_launch_failure_as_unavailable() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|program, args, timeout| {
                program == "docker" && args == ["--version"] && *timeout == Duration::from_secs(5)
            })
            .returning(|program, _, _| {
                Err(RunError::Launch {
                    program: program.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no docker"),
                })
            });
        let renderer = PlantUmlRenderer::new(Arc::new(runner), DiagramConfig::default());
        assert!(!renderer.is_available().await);
    }

    #[tokio::test]
    async fn renders_next_to_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join(DIAGRAM_SOURCE_FILE);
        std::fs::write(&source, "@startuml\n@enduml\n").unwrap();
        let expected_png = std::fs::canonicalize(dir.path()).unwrap().join("diagram.png");

        let png_for_mock = expected_png.clone();
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|_, args, _| {
                args.first().map(String::as_str) == Some("run")
                    && args.last().map(String::as_str) == Some("/work/diagram.puml")
                    && args.contains(&"ghcr.io/plantuml/plantuml".to_string())
            })
            .times(1)
            .returning(move |_, _, _| {
                std::fs::write(&png_for_mock, b"\x89PNG").unwrap();
                Ok(ok(0))
            });

        let renderer = PlantUmlRenderer::new(Arc::new(runner), DiagramConfig::default());
        let image = renderer.render_file(&source).await.unwrap();
        assert_eq!(image, expected_png);
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_render_failure() {
        let dir = tempdir().unwrap();
        let source = dir.path().join(DIAGRAM_SOURCE_FILE);
        std::fs::write(&source, "@startuml\n@enduml\n").unwrap();

        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, _, _| {
            Ok(ProcessOutput {
                stdout: String::new(),
                stderr: "Syntax Error?".into(),
                status: Some(1),
            })
        });
        let renderer = PlantUmlRenderer::new(Arc::new(runner), DiagramConfig::default());
        let err = renderer.render_file(&source).await.unwrap_err();
        assert!(matches!(err, RenderError::Failed { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn source_is_written_even_when_unavailable() {
        let dir = tempdir().unwrap();
        let mut renderer = MockDiagramRenderer::new();
        renderer.expect_is_available().returning(|| false);
        renderer.expect_render_file().never();

        let err = render_to_image(&renderer, "@startuml\n@enduml\n", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Unavailable));
        assert!(dir.path().join(DIAGRAM_SOURCE_FILE).is_file());
    }
}
