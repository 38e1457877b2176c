//! Pipeline configuration loaded from the environment.
//!
//! Values come from `.env` (via dotenvy) or process environment variables;
//! every knob has a working default so the pipeline runs unconfigured.

use std::env;
use std::time::Duration;

/// Tunables for the generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// LibreOffice binary used by the native conversion strategy.
    pub soffice_bin: String,
    /// wkhtmltopdf binary used by the headless HTML render strategy.
    pub wkhtmltopdf_bin: String,
    /// Hard limit per conversion strategy attempt.
    pub convert_timeout: Duration,
    /// Accept unconverted DOCX output when no converter is available.
    pub allow_docx_passthrough: bool,
    /// Maximum accepted source photo size in bytes.
    pub max_photo_bytes: usize,
    /// Maximum accepted output artifact size in bytes.
    pub max_output_bytes: usize,
    /// Prefix for generated certificate numbers.
    pub nomor_prefix: String,
    /// Worker pool size for per-subject batch generation.
    pub batch_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            soffice_bin: "soffice".to_string(),
            wkhtmltopdf_bin: "wkhtmltopdf".to_string(),
            convert_timeout: Duration::from_secs(60),
            allow_docx_passthrough: true,
            max_photo_bytes: 5 * 1024 * 1024,
            max_output_bytes: 20 * 1024 * 1024,
            nomor_prefix: "LKP".to_string(),
            batch_concurrency: 4,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            soffice_bin: env_or("SOFFICE_BIN", defaults.soffice_bin),
            wkhtmltopdf_bin: env_or("WKHTMLTOPDF_BIN", defaults.wkhtmltopdf_bin),
            convert_timeout: Duration::from_secs(parse_or(
                "CONVERT_TIMEOUT_SECS",
                defaults.convert_timeout.as_secs(),
            )),
            allow_docx_passthrough: parse_or(
                "ALLOW_DOCX_PASSTHROUGH",
                defaults.allow_docx_passthrough,
            ),
            max_photo_bytes: parse_or("MAX_PHOTO_BYTES", defaults.max_photo_bytes),
            max_output_bytes: parse_or("MAX_OUTPUT_BYTES", defaults.max_output_bytes),
            nomor_prefix: env_or("SERTIFIKAT_PREFIX", defaults.nomor_prefix),
            batch_concurrency: parse_or("BATCH_CONCURRENCY", defaults.batch_concurrency).max(1),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.nomor_prefix, "LKP");
        assert_eq!(config.convert_timeout, Duration::from_secs(60));
        assert!(config.allow_docx_passthrough);
        assert!(config.batch_concurrency >= 1);
    }
}
