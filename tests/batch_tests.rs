mod common;

use common::{fixture, full_template_bytes, siti};
use kursus_pelita_server::models::Peserta;
use kursus_pelita_server::sertifikat::docx::{extract_text, DocxPackage};
use kursus_pelita_server::sertifikat::{BatchMode, BatchOrchestrator};
use std::collections::HashMap;

fn class_of(n: usize) -> Vec<Peserta> {
    (1..=n)
        .map(|i| Peserta {
            id: format!("S-{i:03}"),
            nama: format!("Peserta {i}"),
            nomor_induk: format!("S-{i:03}"),
            program: "Office Skills".to_string(),
            durasi: "12 jam".to_string(),
            foto: None,
            instruktur: Some("Pak Budi".to_string()),
        })
        .collect()
}

#[tokio::test]
async fn test_per_subject_batch_generates_all() {
    let subjects = class_of(5);
    let fx = fixture(full_template_bytes(), &subjects).await;
    let orchestrator = BatchOrchestrator::new(fx.service.clone());

    let ids: Vec<String> = subjects.iter().map(|p| p.id.clone()).collect();
    let batch = orchestrator
        .generate_batch(
            fx.template_id,
            &ids,
            &HashMap::new(),
            "admin",
            BatchMode::PerSubject,
        )
        .await
        .unwrap();

    assert_eq!(batch.requested, 5);
    assert_eq!(batch.success_count(), 5);
    assert_eq!(batch.failure_count(), 0);
    assert_eq!(fx.hasil.all().await.len(), 5);

    // Each subject gets its own artifact with its own number.
    let mut numbers: Vec<&str> = batch
        .results
        .iter()
        .map(|r| r.nomor_sertifikat.as_str())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    assert_eq!(numbers.len(), 5);
}

#[tokio::test]
async fn test_missing_subject_does_not_abort_batch() {
    let subjects = class_of(4);
    let fx = fixture(full_template_bytes(), &subjects).await;
    let orchestrator = BatchOrchestrator::new(fx.service.clone());

    let mut ids: Vec<String> = subjects.iter().map(|p| p.id.clone()).collect();
    ids.insert(2, "S-404".to_string());
    let batch = orchestrator
        .generate_batch(
            fx.template_id,
            &ids,
            &HashMap::new(),
            "admin",
            BatchMode::PerSubject,
        )
        .await
        .unwrap();

    assert_eq!(batch.requested, 5);
    assert_eq!(batch.success_count(), 4);
    assert_eq!(batch.failure_count(), 1);
    assert_eq!(batch.failures[0].peserta_id, "S-404");
    assert!(!batch.failures[0].reason.is_empty());
}

#[tokio::test]
async fn test_combine_mode_produces_single_artifact() {
    let fx = fixture(
        full_template_bytes(),
        &[
            siti(),
            Peserta {
                id: "S-002".to_string(),
                nama: "Budi".to_string(),
                nomor_induk: "S-002".to_string(),
                program: "Office Skills".to_string(),
                durasi: "12 jam".to_string(),
                foto: None,
                instruktur: None,
            },
        ],
    )
    .await;
    let orchestrator = BatchOrchestrator::new(fx.service.clone());

    let batch = orchestrator
        .generate_batch(
            fx.template_id,
            &["S-001".to_string(), "S-002".to_string()],
            &HashMap::new(),
            "admin",
            BatchMode::Combine,
        )
        .await
        .unwrap();

    assert!(batch.results.is_empty());
    let combined = batch.combined.expect("combined artifact");
    assert_eq!(fx.hasil.all().await.len(), 1);
    assert!(fx.objects.has_file(&combined.file_name).await);

    let package = DocxPackage::open(&combined.content).unwrap();
    let text = extract_text(&package.main_xml().unwrap()).unwrap();
    assert!(text.contains("Siti"));
    assert!(text.contains("Budi"));
}
