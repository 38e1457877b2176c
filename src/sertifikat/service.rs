//! Single-subject generation job.
//!
//! One service drives the whole chain: load → validate → bind → render →
//! convert → persist. Conversion capability differences live behind the
//! strategy registry, not behind parallel service implementations.

use crate::config::PipelineConfig;
use crate::models::{
    BoundData, GenerationRequest, GenerationResult, Peserta, RenderOutcome, TemplateRecord,
};
use crate::sertifikat::common::{
    format_indonesian_date, generate_nomor_sertifikat, sanitize_for_filename,
};
use crate::sertifikat::convert::ConversionPipeline;
use crate::sertifikat::photo::PhotoResolver;
use crate::sertifikat::render::{RenderEngine, RenderedDocument};
use crate::sertifikat::template::{TemplateValidation, TemplateValidator};
use crate::sertifikat::SertifikatError;
use crate::storage::{download_path_for, HasilStore, ObjectStorage, PesertaStore, TemplateStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Orchestrates one certificate generation job end to end.
pub struct SertifikatService {
    config: PipelineConfig,
    templates: Arc<dyn TemplateStore>,
    peserta: Arc<dyn PesertaStore>,
    hasil: Arc<dyn HasilStore>,
    objects: Arc<dyn ObjectStorage>,
    engine: RenderEngine,
    pipeline: ConversionPipeline,
}

impl SertifikatService {
    pub fn new(
        config: PipelineConfig,
        templates: Arc<dyn TemplateStore>,
        peserta: Arc<dyn PesertaStore>,
        hasil: Arc<dyn HasilStore>,
        objects: Arc<dyn ObjectStorage>,
    ) -> Self {
        let pipeline = ConversionPipeline::from_config(&config);
        Self::with_pipeline(config, templates, peserta, hasil, objects, pipeline)
    }

    /// Construct with an explicit strategy registry.
    pub fn with_pipeline(
        config: PipelineConfig,
        templates: Arc<dyn TemplateStore>,
        peserta: Arc<dyn PesertaStore>,
        hasil: Arc<dyn HasilStore>,
        objects: Arc<dyn ObjectStorage>,
        pipeline: ConversionPipeline,
    ) -> Self {
        let resolver = Arc::new(PhotoResolver::new(config.max_photo_bytes));
        Self {
            engine: RenderEngine::new(resolver),
            config,
            templates,
            peserta,
            hasil,
            objects,
            pipeline,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one generation job.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, SertifikatError> {
        let (template, validation) = self.load_validated(&request.template_id).await?;

        let peserta = self
            .peserta
            .get(&request.peserta_id)
            .await
            .map_err(SertifikatError::Storage)?
            .ok_or_else(|| SertifikatError::SubjectNotFound(request.peserta_id.clone()))?;

        log::info!(
            "Generating certificate for '{}' (template '{}', requested by {})",
            peserta.nama,
            template.nama,
            request.requested_by
        );

        let (rendered, nomor) = self
            .render_subject(&template, &validation, &peserta, &request.overrides)
            .await?;

        self.convert_and_persist(
            &template.id,
            &peserta.id,
            &peserta.nama,
            nomor,
            rendered,
        )
        .await
    }

    /// Load a template and run it through the validator. Fails on
    /// unknown ids, inactive templates, and invalid placeholder sets.
    pub async fn load_validated(
        &self,
        template_id: &Uuid,
    ) -> Result<(TemplateRecord, TemplateValidation), SertifikatError> {
        let template = self
            .templates
            .get(template_id)
            .await
            .map_err(SertifikatError::Storage)?
            .ok_or(SertifikatError::TemplateNotFound(*template_id))?;

        if !template.aktif {
            return Err(SertifikatError::TemplateInvalid(format!(
                "template '{}' is not active",
                template.nama
            )));
        }

        let validation = TemplateValidator::validate(&template.content);
        for warning in &validation.warnings {
            log::warn!("Template '{}': {warning}", template.nama);
        }
        if !validation.is_valid {
            return Err(SertifikatError::TemplateInvalid(
                validation.errors.join("; "),
            ));
        }
        Ok((template, validation))
    }

    /// Bind one subject and render; returns the document and its
    /// certificate number.
    pub async fn render_subject(
        &self,
        template: &TemplateRecord,
        validation: &TemplateValidation,
        peserta: &Peserta,
        overrides: &HashMap<String, String>,
    ) -> Result<(RenderedDocument, String), SertifikatError> {
        let nomor = generate_nomor_sertifikat(&self.config.nomor_prefix);
        let tanggal = format_indonesian_date();
        let bound = BoundData::from_peserta(peserta, &nomor, &tanggal, overrides);

        let rendered = self
            .engine
            .render(&template.content, validation, &bound)
            .await?;
        if rendered.outcome == RenderOutcome::Degraded {
            log::warn!(
                "Certificate {nomor} for '{}' rendered via the degraded path",
                peserta.nama
            );
        }
        Ok((rendered, nomor))
    }

    /// Convert a rendered document and persist the result.
    pub async fn convert_and_persist(
        &self,
        template_id: &Uuid,
        peserta_id: &str,
        peserta_nama: &str,
        nomor: String,
        rendered: RenderedDocument,
    ) -> Result<GenerationResult, SertifikatError> {
        let artifact = self.pipeline.convert(&rendered.bytes).await?;

        let file_name = format!(
            "sertifikat-{}-{}.{}",
            sanitize_for_filename(&nomor, "nomor"),
            sanitize_for_filename(peserta_nama, "peserta"),
            artifact.format.extension()
        );

        self.objects
            .upload_file(&file_name, &artifact.bytes)
            .await
            .map_err(SertifikatError::Storage)?;

        let result = GenerationResult {
            id: Uuid::new_v4(),
            nomor_sertifikat: nomor,
            peserta_id: peserta_id.to_string(),
            template_id: *template_id,
            download_path: download_path_for(&file_name),
            file_name,
            size_bytes: artifact.bytes.len(),
            content: artifact.bytes,
            format: artifact.format,
            method: artifact.method,
            render_outcome: rendered.outcome,
            created_at: Utc::now(),
        };

        self.hasil
            .save(&result)
            .await
            .map_err(SertifikatError::Storage)?;

        log::info!(
            "Generated {} ({} bytes, method {}, {:?})",
            result.nomor_sertifikat,
            result.size_bytes,
            result.method,
            result.render_outcome
        );
        Ok(result)
    }

    /// Subject lookup for callers that need names on failure entries.
    pub async fn lookup_peserta(&self, id: &str) -> Result<Option<Peserta>, String> {
        self.peserta.get(id).await
    }
}
