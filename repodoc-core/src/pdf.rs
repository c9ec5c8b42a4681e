//! Markdown to PDF.
//!
//! The primary path converts Markdown to HTML with `pulldown-cmark`, wraps it in a print
//! stylesheet and prints it with a headless Chromium. An opt-in plain-text fallback
//! built with `printpdf` (`pdf.plain_text_fallback`) can follow it. The assembler
//! never fails: if every renderer fails the result is `None`.

use async_trait::async_trait;
use pulldown_cmark::{html, Options, Parser};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PdfConfig;
use crate::contract::{PdfRenderer, ProcessRunner};
use crate::error::PdfError;

const PRINT_STYLESHEET: &str = r#"
    body {
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      line-height: 1.6;
      color: #333;
      padding: 40px;
      max-width: 900px;
      margin: 0 auto;
    }
    h1, h2, h3, h4, h5, h6 {
      margin-top: 24px;
      margin-bottom: 16px;
      font-weight: 600;
      line-height: 1.25;
      border-bottom: 1px solid #eaecef;
      padding-bottom: 8px;
    }
    h1 { font-size: 28px; border-bottom: 2px solid #000; }
    h2 { font-size: 24px; }
    h3 { font-size: 20px; }
    code {
      background-color: #f6f8fa;
      padding: 2px 6px;
      border-radius: 3px;
      font-family: 'Courier New', monospace;
      font-size: 14px;
    }
    pre { background-color: #f6f8fa; border-radius: 6px; padding: 16px; margin: 16px 0; }
    pre code { background-color: transparent; padding: 0; border-radius: 0; }
    table { border-collapse: collapse; width: 100%; margin: 16px 0; }
    table th, table td { border: 1px solid #ddd; padding: 12px; text-align: left; }
    table th { background-color: #f6f8fa; font-weight: 600; }
    blockquote { border-left: 4px solid #ddd; padding-left: 16px; margin-left: 0; color: #666; }
    ul, ol { margin: 16px 0; padding-left: 32px; }
    li { margin: 8px 0; }
    img { max-width: 100%; }
    @page { size: A4; margin: 20mm; }
"#;

pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut body = String::new();
    html::push_html(&mut body, parser);
    body
}

/// Full standalone page: the converted Markdown inside the print stylesheet.
pub fn html_page(markdown: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"UTF-8\">\n  <title>{title}</title>\n  <style>{PRINT_STYLESHEET}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        markdown_to_html(markdown)
    )
}

/// Prints HTML with `chromium --headless --print-to-pdf`. The page is written into
/// `work_dir` first so relative image references resolve.
pub struct HeadlessBrowserPdf {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    timeout: Duration,
}

impl HeadlessBrowserPdf {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &PdfConfig) -> Self {
        Self {
            runner,
            program: config.browser_program.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl PdfRenderer for HeadlessBrowserPdf {
    async fn render(
        &self,
        _markdown: &str,
        html: &str,
        work_dir: &Path,
    ) -> Result<Vec<u8>, PdfError> {
        let work_dir = std::fs::canonicalize(work_dir)?;
        let page = tempfile::Builder::new()
            .prefix(".print-")
            .suffix(".html")
            .tempfile_in(&work_dir)?;
        std::fs::write(page.path(), html)?;
        let target = tempfile::Builder::new()
            .prefix(".print-")
            .suffix(".pdf")
            .tempfile_in(&work_dir)?;

        let args = vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--no-pdf-header-footer".to_string(),
            format!("--print-to-pdf={}", target.path().display()),
            format!("file://{}", page.path().display()),
        ];
        let output = self.runner.run(&self.program, &args, self.timeout).await?;
        if !output.success() {
            return Err(PdfError::Browser {
                code: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let bytes = std::fs::read(target.path())?;
        if bytes.is_empty() {
            return Err(PdfError::EmptyOutput);
        }
        Ok(bytes)
    }
}

/// Monospaced A4 pages of the raw Markdown, using the built-in Courier font.
#[derive(Debug, Clone)]
pub struct PlainTextPdf {
    title: String,
}

impl PlainTextPdf {
    const LINES_PER_PAGE: usize = 60;
    const CHARS_PER_LINE: usize = 90;

    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn build(&self, markdown: &str) -> Vec<u8> {
        use printpdf::{
            BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, TextItem,
        };

        let lines = wrap_lines(markdown, Self::CHARS_PER_LINE);
        let pages: Vec<PdfPage> = lines
            .chunks(Self::LINES_PER_PAGE)
            .map(|chunk| {
                let mut ops = vec![
                    Op::StartTextSection,
                    Op::SetTextCursor {
                        pos: Point::new(Mm(20.0), Mm(277.0)),
                    },
                    Op::SetFontSizeBuiltinFont {
                        size: Pt(9.0),
                        font: BuiltinFont::Courier,
                    },
                    Op::SetLineHeight { lh: Pt(11.5) },
                ];
                for line in chunk {
                    ops.push(Op::WriteTextBuiltinFont {
                        items: vec![TextItem::Text(line.clone())],
                        font: BuiltinFont::Courier,
                    });
                    ops.push(Op::AddLineBreak);
                }
                ops.push(Op::EndTextSection);
                PdfPage::new(Mm(210.0), Mm(297.0), ops)
            })
            .collect();

        let mut warnings = Vec::new();
        let bytes = PdfDocument::new(&self.title)
            .with_pages(pages)
            .save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            tracing::debug!(warnings = warnings.len(), "printpdf reported warnings");
        }
        bytes
    }
}

#[async_trait]
impl PdfRenderer for PlainTextPdf {
    async fn render(
        &self,
        markdown: &str,
        _html: &str,
        _work_dir: &Path,
    ) -> Result<Vec<u8>, PdfError> {
        let bytes = self.build(markdown);
        if bytes.is_empty() {
            return Err(PdfError::EmptyOutput);
        }
        Ok(bytes)
    }
}

/// Hard-wraps text for a fixed-width page. Non-ASCII characters are replaced because the
/// built-in fonts only cover a single-byte encoding. Always yields at least one line.
fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let cleaned: Vec<char> = raw
            .chars()
            .map(|c| match c {
                '\t' => ' ',
                c if c.is_ascii() && !c.is_ascii_control() => c,
                _ => '?',
            })
            .collect();
        if cleaned.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in cleaned.chunks(width.max(1)) {
            lines.push(chunk.iter().collect());
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Tries each renderer in order and keeps the first non-empty PDF.
#[derive(Clone, Default)]
pub struct PdfAssembler {
    renderers: Vec<Arc<dyn PdfRenderer>>,
    title: String,
}

impl PdfAssembler {
    pub fn new(renderers: Vec<Arc<dyn PdfRenderer>>, title: impl Into<String>) -> Self {
        Self {
            renderers,
            title: title.into(),
        }
    }

    /// Browser first, then (if enabled) the plain-text fallback. A disabled config
    /// produces an assembler that always yields `None`.
    pub fn from_config(config: &PdfConfig, runner: Arc<dyn ProcessRunner>, title: &str) -> Self {
        let mut renderers: Vec<Arc<dyn PdfRenderer>> = Vec::new();
        if config.enabled {
            renderers.push(Arc::new(HeadlessBrowserPdf::new(runner, config)));
            if config.plain_text_fallback {
                renderers.push(Arc::new(PlainTextPdf::new(title)));
            }
        }
        Self::new(renderers, title)
    }

    pub async fn to_pdf(&self, markdown: &str, work_dir: &Path) -> Option<Vec<u8>> {
        if self.renderers.is_empty() {
            tracing::info!("PDF generation disabled");
            return None;
        }
        let page = html_page(markdown, &self.title);
        for (index, renderer) in self.renderers.iter().enumerate() {
            match renderer.render(markdown, &page, work_dir).await {
                Ok(bytes) => {
                    tracing::info!(renderer = index, bytes = bytes.len(), "PDF generated");
                    return Some(bytes);
                }
                Err(e) => {
                    tracing::warn!(renderer = index, error = %e, "PDF renderer failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockPdfRenderer, MockProcessRunner, ProcessOutput};
    use crate::error::RunError;

    #[test]
    fn html_page_contains_converted_markdown() {
        let page = html_page("# Title\n\n- **bold** item\n", "Docs");
        assert!(page.contains("<h1>Title</h1>"));
        assert!(page.contains("<strong>bold</strong>"));
        assert!(page.contains("@page { size: A4; margin: 20mm; }"));
        assert!(page.contains("<title>Docs</title>"));
    }

    #[test]
    fn plain_text_pdf_has_pdf_header() {
        let long: String = (0..200).map(|i| format!("line {i} ünïcode\n")).collect();
        let bytes = PlainTextPdf::new("Docs").build(&long);
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn wrap_lines_splits_and_cleans() {
        let lines = wrap_lines("abcdef\n\nü", 4);
        assert_eq!(lines, vec!["abcd", "ef", "", "?"]);
        assert_eq!(wrap_lines("", 10), vec![String::new()]);
    }

    #[tokio::test]
    async fn falls_back_when_browser_is_missing_and_fallback_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|program, _, _| {
            Err(RunError::Launch {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no chromium"),
            })
        });
        let config = PdfConfig {
            plain_text_fallback: true,
            ..PdfConfig::default()
        };
        let assembler = PdfAssembler::from_config(&config, Arc::new(runner), "Docs");
        let pdf = assembler.to_pdf("# Docs\n", dir.path()).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn default_config_yields_none_when_browser_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().times(1).returning(|program, _, _| {
            Err(RunError::Launch {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no chromium"),
            })
        });
        let assembler = PdfAssembler::from_config(&PdfConfig::default(), Arc::new(runner), "Docs");
        assert!(assembler.to_pdf("# Docs\n", dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn browser_failure_without_fallback_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, _, _| {
            Ok(ProcessOutput {
                stdout: String::new(),
                stderr: "crashed".into(),
                status: Some(139),
            })
        });
        let config = PdfConfig {
            plain_text_fallback: false,
            ..PdfConfig::default()
        };
        let assembler = PdfAssembler::from_config(&config, Arc::new(runner), "Docs");
        assert!(assembler.to_pdf("# Docs\n", dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn first_successful_renderer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = MockPdfRenderer::new();
        first
            .expect_render()
            .withf(|md, html, _| md == "# A\n" && html.contains("<h1>A</h1>"))
            .returning(|_, _, _| Ok(b"%PDF-1.7 first".to_vec()));
        let mut second = MockPdfRenderer::new();
        second.expect_render().never();

        let assembler = PdfAssembler::new(vec![Arc::new(first), Arc::new(second)], "Docs");
        assert_eq!(
            assembler.to_pdf("# A\n", dir.path()).await,
            Some(b"%PDF-1.7 first".to_vec())
        );
    }

    #[tokio::test]
    async fn disabled_config_never_runs_anything() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();
        let config = PdfConfig {
            enabled: false,
            ..PdfConfig::default()
        };
        let assembler = PdfAssembler::from_config(&config, Arc::new(runner), "Docs");
        assert!(assembler.to_pdf("# Docs\n", dir.path()).await.is_none());
    }
}
