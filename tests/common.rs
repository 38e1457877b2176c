//! Shared fixtures for the integration tests.

use kursus_pelita_server::config::PipelineConfig;
use kursus_pelita_server::models::{Peserta, TemplateRecord};
use kursus_pelita_server::sertifikat::convert::{ConversionPipeline, DocxPassthroughStrategy};
use kursus_pelita_server::sertifikat::docx::minimal_docx;
use kursus_pelita_server::sertifikat::SertifikatService;
use kursus_pelita_server::storage::memory::{
    InMemoryHasilStore, InMemoryObjectStorage, InMemoryPesertaStore, InMemoryTemplateStore,
};
use std::sync::Arc;

/// A full certificate template with double-brace placeholders.
pub fn full_template_bytes() -> Vec<u8> {
    minimal_docx(&[
        "SERTIFIKAT".to_string(),
        "Nomor: {{nomor_sertifikat}}".to_string(),
        "Diberikan kepada {{nama_peserta}} ({{nomor_induk}})".to_string(),
        "atas kelulusan program {{nama_program}} ({{durasi_program}})".to_string(),
        "Instruktur: {{nama_instruktur}}".to_string(),
        "Diterbitkan {{tanggal_terbit}}".to_string(),
    ])
    .unwrap()
}

/// Same template with single-brace placeholders.
pub fn single_brace_template_bytes() -> Vec<u8> {
    minimal_docx(&[
        "SERTIFIKAT".to_string(),
        "Nomor: {nomor_sertifikat}".to_string(),
        "Diberikan kepada {nama_peserta} ({nomor_induk})".to_string(),
        "atas kelulusan program {nama_program} ({durasi_program})".to_string(),
        "Diterbitkan {tanggal_terbit}".to_string(),
    ])
    .unwrap()
}

pub fn siti() -> Peserta {
    Peserta {
        id: "S-001".to_string(),
        nama: "Siti".to_string(),
        nomor_induk: "S-001".to_string(),
        program: "Office Skills".to_string(),
        durasi: "12 jam".to_string(),
        foto: None,
        instruktur: Some("Pak Budi".to_string()),
    }
}

pub struct Fixture {
    pub service: Arc<SertifikatService>,
    pub template_id: uuid::Uuid,
    pub hasil: Arc<InMemoryHasilStore>,
    pub objects: Arc<InMemoryObjectStorage>,
    pub peserta_store: Arc<InMemoryPesertaStore>,
}

/// Service over in-memory stores with DOCX passthrough as the only
/// conversion strategy, so tests run without external binaries.
pub async fn fixture(template_content: Vec<u8>, subjects: &[Peserta]) -> Fixture {
    let templates = Arc::new(InMemoryTemplateStore::new());
    let peserta_store = Arc::new(InMemoryPesertaStore::new());
    let hasil = Arc::new(InMemoryHasilStore::new());
    let objects = Arc::new(InMemoryObjectStorage::new());

    let template = TemplateRecord::new("Sertifikat Kelulusan", template_content);
    let template_id = template.id;
    templates.insert(template).await;
    for subject in subjects {
        peserta_store.insert(subject.clone()).await;
    }

    let config = PipelineConfig {
        allow_docx_passthrough: true,
        ..PipelineConfig::default()
    };
    let pipeline = ConversionPipeline::new(
        vec![Box::new(DocxPassthroughStrategy)],
        config.max_output_bytes,
    );
    let service = Arc::new(SertifikatService::with_pipeline(
        config,
        templates,
        peserta_store.clone(),
        hasil.clone(),
        objects.clone(),
        pipeline,
    ));

    Fixture {
        service,
        template_id,
        hasil,
        objects,
        peserta_store,
    }
}
