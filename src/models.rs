//! Domain models for the certificate generation pipeline.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Scope of a certificate template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateScope {
    /// Usable for any program.
    Umum,
    /// Bound to a single program by name.
    Program(String),
}

/// Placeholder delimiter syntax accepted in templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterSyntax {
    /// `{{nama_peserta}}`
    DoubleBrace,
    /// `{nama_peserta}`
    SingleBrace,
}

impl DelimiterSyntax {
    /// Render the literal token for a placeholder name.
    pub fn token(&self, name: &str) -> String {
        match self {
            DelimiterSyntax::DoubleBrace => format!("{{{{{name}}}}}"),
            DelimiterSyntax::SingleBrace => format!("{{{name}}}"),
        }
    }
}

/// A named placeholder discovered in a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderToken {
    pub name: String,
    pub syntax: DelimiterSyntax,
    pub required: bool,
    /// Surrounding text snippet for diagnostics.
    pub context: String,
}

/// A stored certificate template. Content is immutable; replacing a
/// template means uploading a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: Uuid,
    pub nama: String,
    /// DOCX bytes (a ZIP archive containing `word/document.xml`).
    #[serde(skip_serializing, default)]
    pub content: Vec<u8>,
    pub scope: TemplateScope,
    pub aktif: bool,
    /// Placeholder set discovered at upload time.
    #[serde(default)]
    pub placeholders: Vec<PlaceholderToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateRecord {
    /// Build a general-scope template record around raw DOCX bytes.
    pub fn new(nama: impl Into<String>, content: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            nama: nama.into(),
            content,
            scope: TemplateScope::Umum,
            aktif: true,
            placeholders: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A course participant (the certificate subject).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peserta {
    pub id: String,
    pub nama: String,
    /// Institutional id printed on the certificate.
    pub nomor_induk: String,
    pub program: String,
    /// Program duration as displayed, e.g. "12 jam".
    pub durasi: String,
    /// Opaque photo reference: an URL, a storage path, or absent.
    #[serde(default)]
    pub foto: Option<String>,
    #[serde(default)]
    pub instruktur: Option<String>,
}

/// A request to generate one certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub template_id: Uuid,
    pub peserta_id: String,
    /// Caller-supplied values that win over subject-derived ones.
    #[serde(default)]
    pub overrides: HashMap<String, String>,
    pub requested_by: String,
}

/// Flattened placeholder-name → value map for one render.
///
/// The photo stays an unresolved reference until render time; only the
/// Rendering Engine turns it into bytes.
#[derive(Debug, Clone, Default)]
pub struct BoundData {
    pub values: HashMap<String, String>,
    pub photo: Option<String>,
}

impl BoundData {
    /// Flatten a subject plus the generated certificate number into
    /// placeholder values, then apply caller overrides on top.
    pub fn from_peserta(
        peserta: &Peserta,
        nomor_sertifikat: &str,
        tanggal_terbit: &str,
        overrides: &HashMap<String, String>,
    ) -> Self {
        let mut values = HashMap::new();
        values.insert("nama_peserta".to_string(), peserta.nama.clone());
        values.insert("nomor_induk".to_string(), peserta.nomor_induk.clone());
        values.insert("nama_program".to_string(), peserta.program.clone());
        values.insert("durasi_program".to_string(), peserta.durasi.clone());
        values.insert("tanggal_terbit".to_string(), tanggal_terbit.to_string());
        values.insert("nomor_sertifikat".to_string(), nomor_sertifikat.to_string());
        if let Some(instruktur) = &peserta.instruktur {
            values.insert("nama_instruktur".to_string(), instruktur.clone());
        }

        let mut photo = peserta.foto.clone().filter(|f| !f.trim().is_empty());
        for (key, value) in overrides {
            if key == "foto_peserta" {
                photo = Some(value.clone()).filter(|f| !f.trim().is_empty());
            } else {
                values.insert(key.clone(), value.clone());
            }
        }

        Self { values, photo }
    }
}

/// Which rendering path produced the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderOutcome {
    /// Formatting-preserving structural substitution.
    Structural,
    /// Plain-text fallback; original styling and photo are lost.
    Degraded,
}

/// Output artifact format, detected from the byte signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Docx,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
        }
    }
}

/// The persisted outcome of one successful generation job. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub id: Uuid,
    pub nomor_sertifikat: String,
    pub peserta_id: String,
    pub template_id: Uuid,
    pub file_name: String,
    pub download_path: String,
    #[serde(skip_serializing, default)]
    pub content: Vec<u8>,
    pub size_bytes: usize,
    pub format: OutputFormat,
    /// Name of the conversion strategy that produced the output.
    pub method: String,
    pub render_outcome: RenderOutcome,
    pub created_at: DateTime<Utc>,
}

/// One failed subject inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub peserta_id: String,
    pub nama: String,
    pub reason: String,
}

/// Aggregate outcome of a batch call. Transient; not persisted as a unit.
#[derive(Debug, Default, Serialize)]
pub struct BatchResult {
    pub requested: usize,
    pub results: Vec<GenerationResult>,
    pub failures: Vec<BatchFailure>,
    /// Present only in combine mode.
    pub combined: Option<GenerationResult>,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.results.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Download payload handed to API consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileArtifact {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    /// Base64-encoded file content.
    pub data: String,
    pub created_at: String,
}

impl FileArtifact {
    pub fn from_result(result: &GenerationResult) -> Self {
        Self {
            filename: result.file_name.clone(),
            mime_type: result.format.mime_type().to_string(),
            size_bytes: result.size_bytes,
            data: BASE64.encode(&result.content),
            created_at: result.created_at.to_rfc3339(),
        }
    }
}
