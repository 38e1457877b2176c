//! Certificate generation pipeline.
//!
//! Validator → Rendering Engine (fed by the Photo Resolver) → Conversion
//! Pipeline → persisted GenerationResult, fanned out per subject by the
//! Batch Orchestrator.

pub mod batch;
pub mod common;
pub mod convert;
pub mod docx;
pub mod photo;
pub mod render;
pub mod service;
pub mod template;

pub use batch::{BatchMode, BatchOrchestrator};
pub use convert::{ConversionPipeline, ConvertStrategy};
pub use photo::PhotoResolver;
pub use render::{RenderEngine, RenderedDocument};
pub use service::SertifikatService;
pub use template::{TemplateValidation, TemplateValidator};

use thiserror::Error;
use uuid::Uuid;

/// Fatal errors for a single generation job. Photo problems never appear
/// here; they degrade to the placeholder image inside the resolver.
#[derive(Debug, Error)]
pub enum SertifikatError {
    #[error("template not found: {0}")]
    TemplateNotFound(Uuid),
    #[error("template invalid: {0}")]
    TemplateInvalid(String),
    #[error("subject not found: {0}")]
    SubjectNotFound(String),
    #[error("missing required value '{0}'")]
    MissingRequiredValue(String),
    #[error("render failed: {0}")]
    Render(#[from] docx::DocxError),
    #[error("conversion exhausted after {attempts} attempts, last error: {last_error}")]
    ConversionExhausted { attempts: usize, last_error: String },
    #[error("output validation failed: {0}")]
    OutputInvalid(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("io error: {0}")]
    Io(#[source] std::io::Error),
}
