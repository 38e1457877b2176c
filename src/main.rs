//! `sertifikat-cli`: generate certificates from a DOCX template and a
//! participant JSON file, writing the artifacts to an output directory.
//!
//! Usage: sertifikat-cli <template.docx> <peserta.json> <output-dir>
//!
//! The participant file holds either a single subject object or an array of
//! subjects; with more than one subject the batch path runs.

use anyhow::{bail, Context};
use kursus_pelita_server::config::PipelineConfig;
use kursus_pelita_server::models::{GenerationRequest, Peserta, TemplateRecord};
use kursus_pelita_server::sertifikat::{BatchMode, BatchOrchestrator, SertifikatService};
use kursus_pelita_server::storage::memory::{
    InMemoryHasilStore, InMemoryPesertaStore, InMemoryTemplateStore,
};
use kursus_pelita_server::storage::FsObjectStorage;
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        bail!("usage: {} <template.docx> <peserta.json> <output-dir>", args[0]);
    }
    let (template_path, peserta_path, out_dir) = (&args[1], &args[2], &args[3]);

    let template_bytes = tokio::fs::read(template_path)
        .await
        .with_context(|| format!("failed to read template {template_path}"))?;
    let peserta_raw = tokio::fs::read_to_string(peserta_path)
        .await
        .with_context(|| format!("failed to read subjects {peserta_path}"))?;
    let subjects: Vec<Peserta> = match serde_json::from_str::<Vec<Peserta>>(&peserta_raw) {
        Ok(list) => list,
        Err(_) => vec![serde_json::from_str::<Peserta>(&peserta_raw)
            .context("subjects file is neither a Peserta array nor a single Peserta")?],
    };
    if subjects.is_empty() {
        bail!("subjects file contains no participants");
    }

    let config = PipelineConfig::from_env();
    let templates = Arc::new(InMemoryTemplateStore::new());
    let peserta_store = Arc::new(InMemoryPesertaStore::new());
    let hasil = Arc::new(InMemoryHasilStore::new());
    let objects = Arc::new(FsObjectStorage::new(out_dir));

    let template = TemplateRecord::new("cli-template", template_bytes);
    let template_id = template.id;
    templates.insert(template).await;
    for subject in &subjects {
        peserta_store.insert(subject.clone()).await;
    }

    let service = Arc::new(SertifikatService::new(
        config,
        templates,
        peserta_store,
        hasil,
        objects,
    ));

    if subjects.len() == 1 {
        let request = GenerationRequest {
            template_id,
            peserta_id: subjects[0].id.clone(),
            overrides: HashMap::new(),
            requested_by: "cli".to_string(),
        };
        let result = service.generate(&request).await?;
        println!(
            "{} -> {}/{} ({} bytes, {})",
            result.nomor_sertifikat,
            out_dir,
            result.file_name,
            result.size_bytes,
            result.method
        );
        return Ok(());
    }

    let ids: Vec<String> = subjects.iter().map(|p| p.id.clone()).collect();
    let batch = BatchOrchestrator::new(service)
        .generate_batch(
            template_id,
            &ids,
            &HashMap::new(),
            "cli",
            BatchMode::PerSubject,
        )
        .await?;

    for result in &batch.results {
        println!(
            "{} -> {}/{} ({} bytes, {})",
            result.nomor_sertifikat, out_dir, result.file_name, result.size_bytes, result.method
        );
    }
    for failure in &batch.failures {
        eprintln!("FAILED {} ({}): {}", failure.peserta_id, failure.nama, failure.reason);
    }
    if batch.success_count() == 0 {
        bail!("no certificates generated");
    }
    Ok(())
}
