//! Rendering engine: binds subject data into a validated template.
//!
//! The structural path substitutes in place and keeps every non-placeholder
//! byte of the document XML; the degraded path is a last resort that
//! re-emits the template as unstyled text and skips the photo.

use crate::models::{BoundData, RenderOutcome};
use crate::sertifikat::docx::{
    heal_split_placeholders, minimal_docx, substitute_tokens, DocxPackage,
};
use crate::sertifikat::photo::PhotoResolver;
use crate::sertifikat::template::{
    TemplateValidation, TemplateValidator, OPTIONAL_PLACEHOLDERS, PHOTO_PLACEHOLDER,
    REQUIRED_PLACEHOLDERS,
};
use crate::sertifikat::SertifikatError;
use std::sync::Arc;

/// Embedded photo footprint in pixels (EMU-scaled by the container layer).
const PHOTO_ANCHOR_WIDTH: u32 = 150;
const PHOTO_ANCHOR_HEIGHT: u32 = 200;

/// A rendered (still editable) document plus which path produced it.
#[derive(Debug)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub outcome: RenderOutcome,
}

/// Binds [`BoundData`] into validated template bytes.
pub struct RenderEngine {
    resolver: Arc<PhotoResolver>,
}

impl RenderEngine {
    pub fn new(resolver: Arc<PhotoResolver>) -> Self {
        Self { resolver }
    }

    /// Render with the structural path, falling back to the degraded path
    /// only when the structural path errors.
    ///
    /// A missing required value is fatal for both paths. A photo that
    /// cannot be resolved or embedded is skipped, not fatal.
    pub async fn render(
        &self,
        template: &[u8],
        validation: &TemplateValidation,
        bound: &BoundData,
    ) -> Result<RenderedDocument, SertifikatError> {
        for required in REQUIRED_PLACEHOLDERS {
            match bound.values.get(required) {
                Some(value) if !value.trim().is_empty() => {}
                _ => return Err(SertifikatError::MissingRequiredValue(required.to_string())),
            }
        }

        match self.render_structural(template, validation, bound).await {
            Ok(bytes) => Ok(RenderedDocument {
                bytes,
                outcome: RenderOutcome::Structural,
            }),
            Err(e) => {
                log::warn!("Structural render failed ({e}); entering degraded path");
                let bytes = render_degraded(template, validation, bound)?;
                Ok(RenderedDocument {
                    bytes,
                    outcome: RenderOutcome::Degraded,
                })
            }
        }
    }

    async fn render_structural(
        &self,
        template: &[u8],
        validation: &TemplateValidation,
        bound: &BoundData,
    ) -> Result<Vec<u8>, SertifikatError> {
        let syntax = validation
            .syntax
            .ok_or_else(|| SertifikatError::TemplateInvalid("no active syntax".to_string()))?;

        let mut package = DocxPackage::open(template)?;
        let healed = heal_split_placeholders(&package.main_xml()?);

        let mut pairs: Vec<(String, String)> = bound
            .values
            .iter()
            .filter(|(name, _)| name.as_str() != PHOTO_PLACEHOLDER)
            .map(|(name, value)| (syntax.token(name), value.clone()))
            .collect();
        // Optional tokens with no bound value are blanked, not left literal.
        for name in OPTIONAL_PLACEHOLDERS {
            if name != PHOTO_PLACEHOLDER && !bound.values.contains_key(name) {
                pairs.push((syntax.token(name), String::new()));
            }
        }
        package.set_main_xml(substitute_tokens(&healed, &pairs));

        if validation.has_token(PHOTO_PLACEHOLDER) {
            let photo_token = syntax.token(PHOTO_PLACEHOLDER);
            match &bound.photo {
                Some(reference) => {
                    // Resolution is infallible; it degrades to the default
                    // placeholder raster internally.
                    let resolved = self.resolver.resolve(reference).await;
                    if let Err(e) = crate::sertifikat::docx::embed_photo(
                        &mut package,
                        &photo_token,
                        &resolved.bytes,
                        PHOTO_ANCHOR_WIDTH,
                        PHOTO_ANCHOR_HEIGHT,
                    ) {
                        log::warn!("Photo embed failed ({e}); rendering without photo");
                        blank_token(&mut package, &photo_token)?;
                    }
                }
                // No reference: blank the token, never invoke the resolver.
                None => blank_token(&mut package, &photo_token)?,
            }
        }

        Ok(package.into_bytes()?)
    }
}

fn blank_token(package: &mut DocxPackage, token: &str) -> Result<(), SertifikatError> {
    let xml = package.main_xml()?;
    if xml.contains(token) {
        package.set_main_xml(xml.replace(token, ""));
    }
    Ok(())
}

/// Degraded path: plain-text flow, raw substitution, minimal document,
/// no photo.
fn render_degraded(
    template: &[u8],
    validation: &TemplateValidation,
    bound: &BoundData,
) -> Result<Vec<u8>, SertifikatError> {
    let (text, _) =
        TemplateValidator::parse(template).map_err(SertifikatError::TemplateInvalid)?;
    let syntax = validation
        .syntax
        .ok_or_else(|| SertifikatError::TemplateInvalid("no active syntax".to_string()))?;

    let mut flat = text;
    for (name, value) in &bound.values {
        if name == PHOTO_PLACEHOLDER {
            continue;
        }
        flat = flat.replace(&syntax.token(name), value);
    }
    for name in OPTIONAL_PLACEHOLDERS {
        flat = flat.replace(&syntax.token(name), "");
    }

    let paragraphs: Vec<String> = flat.lines().map(|l| l.to_string()).collect();
    Ok(minimal_docx(&paragraphs)?)
}
