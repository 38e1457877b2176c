//! Conversion pipeline: editable document → distributable artifact.
//!
//! An ordered registry of capability-checked strategies. Each attempt is
//! bounded by a timeout; the first strategy that returns bytes passing
//! output validation wins. Temporary files live in scoped directories
//! that are released on every exit path.

use crate::config::PipelineConfig;
use crate::models::OutputFormat;
use crate::sertifikat::docx::{extract_text, DocxPackage, DOCX_MAGIC, PDF_MAGIC};
use crate::sertifikat::SertifikatError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// One way of turning a rendered document into the output artifact.
#[async_trait]
pub trait ConvertStrategy: Send + Sync {
    /// Stable name recorded on the GenerationResult.
    fn name(&self) -> &'static str;

    /// Cheap capability probe; unavailable strategies are skipped.
    async fn is_available(&self) -> bool;

    async fn convert(&self, docx: &[u8]) -> Result<Vec<u8>, String>;
}

/// Detect the output format from its byte signature.
pub fn sniff_format(bytes: &[u8]) -> Option<OutputFormat> {
    if bytes.starts_with(PDF_MAGIC) {
        Some(OutputFormat::Pdf)
    } else if bytes.starts_with(DOCX_MAGIC) {
        Some(OutputFormat::Docx)
    } else {
        None
    }
}

/// Validate a conversion product: non-empty, accepted signature, bounded
/// size. Callers never see an unvalidated buffer.
pub fn validate_output(bytes: &[u8], max_bytes: usize) -> Result<OutputFormat, String> {
    if bytes.is_empty() {
        return Err("output buffer is empty".to_string());
    }
    if bytes.len() > max_bytes {
        return Err(format!(
            "output too large: {} bytes (cap {max_bytes})",
            bytes.len()
        ));
    }
    sniff_format(bytes).ok_or_else(|| "output signature is neither PDF nor DOCX".to_string())
}

/// Native conversion through the LibreOffice CLI.
pub struct LibreOfficeStrategy {
    bin: String,
    timeout: Duration,
}

impl LibreOfficeStrategy {
    pub fn new(bin: String, timeout: Duration) -> Self {
        Self { bin, timeout }
    }
}

#[async_trait]
impl ConvertStrategy for LibreOfficeStrategy {
    fn name(&self) -> &'static str {
        "libreoffice"
    }

    async fn is_available(&self) -> bool {
        probe_binary(&self.bin, &["--version"]).await
    }

    async fn convert(&self, docx: &[u8]) -> Result<Vec<u8>, String> {
        let temp_dir = tempfile::tempdir().map_err(|e| format!("temp dir: {e}"))?;
        let input_path = temp_dir.path().join("sertifikat.docx");
        tokio::fs::write(&input_path, docx)
            .await
            .map_err(|e| format!("write input: {e}"))?;

        // kill_on_drop reaps the process when the timeout drops the future.
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(temp_dir.path())
            .arg(&input_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = timeout(self.timeout, cmd.status())
            .await
            .map_err(|_| format!("timed out after {:?}", self.timeout))?
            .map_err(|e| format!("spawn failed: {e}"))?;

        if !status.success() {
            return Err(format!("exited with status {}", status.code().unwrap_or(-1)));
        }

        let output_path = temp_dir.path().join("sertifikat.pdf");
        tokio::fs::read(&output_path)
            .await
            .map_err(|e| format!("read output: {e}"))
    }
}

/// Headless fixed-layout render over an HTML projection of the document
/// text. Loses DOCX styling; used when native conversion is unavailable.
pub struct HtmlRenderStrategy {
    bin: String,
    timeout: Duration,
}

impl HtmlRenderStrategy {
    pub fn new(bin: String, timeout: Duration) -> Self {
        Self { bin, timeout }
    }

    fn project_html(docx: &[u8]) -> Result<String, String> {
        let package = DocxPackage::open(docx).map_err(|e| format!("unpack: {e}"))?;
        let xml = package.main_xml().map_err(|e| format!("main part: {e}"))?;
        let text = extract_text(&xml).map_err(|e| format!("extract: {e}"))?;

        let mut body = String::new();
        for line in text.lines() {
            body.push_str("<p>");
            body.push_str(&html_escape(line));
            body.push_str("</p>\n");
        }
        Ok(format!(
            concat!(
                "<!DOCTYPE html><html><head><meta charset=\"utf-8\">",
                "<style>body{{font-family:serif;margin:48px;text-align:center}}",
                "p{{margin:6px 0}}</style></head><body>\n{}</body></html>\n"
            ),
            body
        ))
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[async_trait]
impl ConvertStrategy for HtmlRenderStrategy {
    fn name(&self) -> &'static str {
        "html-render"
    }

    async fn is_available(&self) -> bool {
        probe_binary(&self.bin, &["--version"]).await
    }

    async fn convert(&self, docx: &[u8]) -> Result<Vec<u8>, String> {
        let html = Self::project_html(docx)?;

        let temp_dir = tempfile::tempdir().map_err(|e| format!("temp dir: {e}"))?;
        let input_path = temp_dir.path().join("sertifikat.html");
        let output_path = temp_dir.path().join("sertifikat.pdf");
        tokio::fs::write(&input_path, html)
            .await
            .map_err(|e| format!("write input: {e}"))?;

        let mut cmd = Command::new(&self.bin);
        cmd.arg("--quiet")
            .arg(&input_path)
            .arg(&output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = timeout(self.timeout, cmd.status())
            .await
            .map_err(|_| format!("timed out after {:?}", self.timeout))?
            .map_err(|e| format!("spawn failed: {e}"))?;

        if !status.success() {
            return Err(format!("exited with status {}", status.code().unwrap_or(-1)));
        }

        tokio::fs::read(&output_path)
            .await
            .map_err(|e| format!("read output: {e}"))
    }
}

/// Relaxed mode: hand back the editable document unchanged when no
/// converter is installed. Config-gated.
pub struct DocxPassthroughStrategy;

#[async_trait]
impl ConvertStrategy for DocxPassthroughStrategy {
    fn name(&self) -> &'static str {
        "docx-passthrough"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn convert(&self, docx: &[u8]) -> Result<Vec<u8>, String> {
        Ok(docx.to_vec())
    }
}

async fn probe_binary(bin: &str, args: &[&str]) -> bool {
    let mut cmd = Command::new(bin);
    cmd.args(args).stdout(Stdio::null()).stderr(Stdio::null());
    matches!(cmd.status().await, Ok(status) if status.success())
}

/// A validated conversion product.
#[derive(Debug)]
pub struct ConvertedArtifact {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// Name of the strategy that produced the bytes.
    pub method: String,
}

/// Ordered strategy registry.
pub struct ConversionPipeline {
    strategies: Vec<Box<dyn ConvertStrategy>>,
    max_output_bytes: usize,
}

impl ConversionPipeline {
    /// Default ordering: native conversion, then headless HTML render,
    /// then (when allowed) DOCX passthrough.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut strategies: Vec<Box<dyn ConvertStrategy>> = vec![
            Box::new(LibreOfficeStrategy::new(
                config.soffice_bin.clone(),
                config.convert_timeout,
            )),
            Box::new(HtmlRenderStrategy::new(
                config.wkhtmltopdf_bin.clone(),
                config.convert_timeout,
            )),
        ];
        if config.allow_docx_passthrough {
            strategies.push(Box::new(DocxPassthroughStrategy));
        }
        Self::new(strategies, config.max_output_bytes)
    }

    pub fn new(strategies: Vec<Box<dyn ConvertStrategy>>, max_output_bytes: usize) -> Self {
        Self {
            strategies,
            max_output_bytes,
        }
    }

    /// Run strategies in order; first validated product wins.
    pub async fn convert(&self, docx: &[u8]) -> Result<ConvertedArtifact, SertifikatError> {
        let mut attempts = 0usize;
        let mut last_error = String::new();

        for strategy in &self.strategies {
            if !strategy.is_available().await {
                log::debug!("Strategy '{}' unavailable, skipping", strategy.name());
                continue;
            }
            attempts += 1;

            match strategy.convert(docx).await {
                Ok(bytes) => match validate_output(&bytes, self.max_output_bytes) {
                    Ok(format) => {
                        log::info!(
                            "Conversion succeeded via '{}' ({} bytes, {:?})",
                            strategy.name(),
                            bytes.len(),
                            format
                        );
                        return Ok(ConvertedArtifact {
                            bytes,
                            format,
                            method: strategy.name().to_string(),
                        });
                    }
                    Err(e) => {
                        log::warn!("Strategy '{}' output rejected: {e}", strategy.name());
                        last_error = format!("{}: {e}", strategy.name());
                    }
                },
                Err(e) => {
                    log::warn!("Strategy '{}' failed: {e}", strategy.name());
                    last_error = format!("{}: {e}", strategy.name());
                }
            }
        }

        if attempts == 0 {
            last_error = if self.strategies.is_empty() {
                "no conversion strategy registered".to_string()
            } else {
                "no conversion strategy available".to_string()
            };
        }
        Err(SertifikatError::ConversionExhausted {
            attempts,
            last_error,
        })
    }
}
