//! Batch generation with per-subject failure isolation.
//!
//! One failed subject never aborts the batch: each fatal error becomes a
//! failure entry and the remaining subjects keep going. Combine mode merges
//! every successful render into a single document before conversion, so a
//! conversion failure there fails the whole call.

use crate::models::{BatchFailure, BatchResult, GenerationRequest, RenderOutcome};
use crate::sertifikat::docx::merge_documents;
use crate::sertifikat::service::SertifikatService;
use crate::sertifikat::SertifikatError;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// How a batch call packages its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// One artifact per subject.
    PerSubject,
    /// All subjects merged into one artifact.
    Combine,
}

/// Fans one template out over many subjects.
pub struct BatchOrchestrator {
    service: Arc<SertifikatService>,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(service: Arc<SertifikatService>) -> Self {
        let concurrency = service.config().batch_concurrency.max(1);
        Self {
            service,
            concurrency,
        }
    }

    /// Run a batch. In [`BatchMode::PerSubject`] this never returns `Err`;
    /// subject failures land in [`BatchResult::failures`]. In
    /// [`BatchMode::Combine`] a merge or conversion failure is fatal for
    /// the whole call.
    pub async fn generate_batch(
        &self,
        template_id: Uuid,
        peserta_ids: &[String],
        overrides: &HashMap<String, String>,
        requested_by: &str,
        mode: BatchMode,
    ) -> Result<BatchResult, SertifikatError> {
        match mode {
            BatchMode::PerSubject => Ok(self
                .per_subject(template_id, peserta_ids, overrides, requested_by)
                .await),
            BatchMode::Combine => {
                self.combine(template_id, peserta_ids, overrides, requested_by)
                    .await
            }
        }
    }

    async fn per_subject(
        &self,
        template_id: Uuid,
        peserta_ids: &[String],
        overrides: &HashMap<String, String>,
        requested_by: &str,
    ) -> BatchResult {
        let outcomes: Vec<_> = stream::iter(peserta_ids.iter().cloned())
            .map(|peserta_id| {
                let service = self.service.clone();
                let request = GenerationRequest {
                    template_id,
                    peserta_id: peserta_id.clone(),
                    overrides: overrides.clone(),
                    requested_by: requested_by.to_string(),
                };
                async move { (peserta_id, service.generate(&request).await) }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut batch = BatchResult {
            requested: peserta_ids.len(),
            ..BatchResult::default()
        };
        for (peserta_id, outcome) in outcomes {
            match outcome {
                Ok(result) => batch.results.push(result),
                Err(e) => {
                    log::warn!("Batch subject '{peserta_id}' failed: {e}");
                    batch
                        .failures
                        .push(self.failure_entry(peserta_id, e).await);
                }
            }
        }

        log::info!(
            "Batch done: {}/{} succeeded, {} failed",
            batch.success_count(),
            batch.requested,
            batch.failure_count()
        );
        batch
    }

    async fn combine(
        &self,
        template_id: Uuid,
        peserta_ids: &[String],
        overrides: &HashMap<String, String>,
        requested_by: &str,
    ) -> Result<BatchResult, SertifikatError> {
        let (template, validation) = self.service.load_validated(&template_id).await?;

        let mut batch = BatchResult {
            requested: peserta_ids.len(),
            ..BatchResult::default()
        };
        let mut documents = Vec::new();
        let mut outcome = RenderOutcome::Structural;

        for peserta_id in peserta_ids {
            let rendered = async {
                let peserta = self
                    .service
                    .lookup_peserta(peserta_id)
                    .await
                    .map_err(SertifikatError::Storage)?
                    .ok_or_else(|| SertifikatError::SubjectNotFound(peserta_id.clone()))?;
                self.service
                    .render_subject(&template, &validation, &peserta, overrides)
                    .await
            }
            .await;

            match rendered {
                Ok((document, _nomor)) => {
                    if document.outcome == RenderOutcome::Degraded {
                        outcome = RenderOutcome::Degraded;
                    }
                    documents.push(document.bytes);
                }
                Err(e) => {
                    log::warn!("Combine subject '{peserta_id}' failed: {e}");
                    batch
                        .failures
                        .push(self.failure_entry(peserta_id.clone(), e).await);
                }
            }
        }

        if documents.is_empty() {
            return Err(SertifikatError::OutputInvalid(
                "no documents rendered for combined output".to_string(),
            ));
        }

        let merged = merge_documents(&documents)?;
        let nomor = crate::sertifikat::common::generate_nomor_sertifikat(
            &self.service.config().nomor_prefix,
        );
        let combined = self
            .service
            .convert_and_persist(
                &template_id,
                "gabungan",
                "gabungan",
                nomor,
                crate::sertifikat::render::RenderedDocument {
                    bytes: merged,
                    outcome,
                },
            )
            .await?;

        log::info!(
            "Combined batch done: {} subjects merged, {} failed, requested by {requested_by}",
            documents.len(),
            batch.failure_count()
        );
        batch.combined = Some(combined);
        Ok(batch)
    }

    async fn failure_entry(&self, peserta_id: String, error: SertifikatError) -> BatchFailure {
        let nama = match self.service.lookup_peserta(&peserta_id).await {
            Ok(Some(peserta)) => peserta.nama,
            _ => String::new(),
        };
        BatchFailure {
            peserta_id,
            nama,
            reason: error.to_string(),
        }
    }
}
