//! Certificate generation pipeline for the course administration platform.
//!
//! Takes an uploaded DOCX template, binds participant data into it without
//! disturbing the original formatting, converts the result to PDF through a
//! chain of fallback strategies, and persists the outcome. Batch generation
//! isolates per-subject failures.

pub mod config;
pub mod models;
pub mod sertifikat;
pub mod storage;

pub use crate::config::PipelineConfig;
pub use crate::sertifikat::{
    BatchMode, BatchOrchestrator, SertifikatError, SertifikatService, TemplateValidator,
};
