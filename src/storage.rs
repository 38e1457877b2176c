//! Seams to the surrounding record system and object storage.
//!
//! The admin platform owns authentication, routing, and the durable
//! student/course records; the pipeline only needs id-keyed lookups and
//! append-only saves, expressed as the traits below. In-memory
//! implementations back the CLI and the test suite.

use crate::models::{GenerationResult, Peserta, TemplateRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Id-keyed template lookup.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, id: &Uuid) -> Result<Option<TemplateRecord>, String>;
}

/// Id-keyed subject lookup.
#[async_trait]
pub trait PesertaStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Peserta>, String>;
}

/// Append-only persistence for generation results.
#[async_trait]
pub trait HasilStore: Send + Sync {
    async fn save(&self, result: &GenerationResult) -> Result<(), String>;
}

/// Object storage for output artifacts.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload_file(&self, filename: &str, file_data: &[u8]) -> Result<(), String>;
}

/// Download route convention the surrounding server exposes.
pub fn download_path_for(filename: &str) -> String {
    format!("/sertifikat/serve/{filename}")
}

/// Filesystem-backed object storage used by the CLI.
pub struct FsObjectStorage {
    base_dir: PathBuf,
}

impl FsObjectStorage {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn upload_file(&self, filename: &str, file_data: &[u8]) -> Result<(), String> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| format!("failed to create output dir: {e}"))?;
        let path = self.base_dir.join(filename);
        tokio::fs::write(&path, file_data)
            .await
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        log::info!("Stored artifact {} ({} bytes)", path.display(), file_data.len());
        Ok(())
    }
}

/// In-memory stores for the CLI and tests.
pub mod memory {
    use super::*;

    #[derive(Default)]
    pub struct InMemoryTemplateStore {
        templates: Mutex<HashMap<Uuid, TemplateRecord>>,
    }

    impl InMemoryTemplateStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert(&self, template: TemplateRecord) {
            self.templates.lock().await.insert(template.id, template);
        }
    }

    #[async_trait]
    impl TemplateStore for InMemoryTemplateStore {
        async fn get(&self, id: &Uuid) -> Result<Option<TemplateRecord>, String> {
            Ok(self.templates.lock().await.get(id).cloned())
        }
    }

    #[derive(Default)]
    pub struct InMemoryPesertaStore {
        peserta: Mutex<HashMap<String, Peserta>>,
    }

    impl InMemoryPesertaStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert(&self, peserta: Peserta) {
            self.peserta.lock().await.insert(peserta.id.clone(), peserta);
        }
    }

    #[async_trait]
    impl PesertaStore for InMemoryPesertaStore {
        async fn get(&self, id: &str) -> Result<Option<Peserta>, String> {
            Ok(self.peserta.lock().await.get(id).cloned())
        }
    }

    #[derive(Default)]
    pub struct InMemoryHasilStore {
        results: Mutex<Vec<GenerationResult>>,
    }

    impl InMemoryHasilStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn all(&self) -> Vec<GenerationResult> {
            self.results.lock().await.clone()
        }
    }

    #[async_trait]
    impl HasilStore for InMemoryHasilStore {
        async fn save(&self, result: &GenerationResult) -> Result<(), String> {
            self.results.lock().await.push(result.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct InMemoryObjectStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl InMemoryObjectStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn has_file(&self, filename: &str) -> bool {
            self.files.lock().await.contains_key(filename)
        }

        pub async fn read(&self, filename: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(filename).cloned()
        }
    }

    #[async_trait]
    impl ObjectStorage for InMemoryObjectStorage {
        async fn upload_file(&self, filename: &str, file_data: &[u8]) -> Result<(), String> {
            self.files
                .lock()
                .await
                .insert(filename.to_string(), file_data.to_vec());
            Ok(())
        }
    }
}
