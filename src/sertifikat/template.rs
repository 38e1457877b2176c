//! Template parsing, placeholder discovery, and validation.
//!
//! Every template must pass through [`TemplateValidator::validate`] before
//! it is rendered; discovery here decides the active delimiter syntax used
//! by the Rendering Engine.

use crate::models::{DelimiterSyntax, PlaceholderToken};
use crate::sertifikat::docx::{extract_text, DocxPackage};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Placeholder names a template must carry to be renderable.
pub const REQUIRED_PLACEHOLDERS: [&str; 6] = [
    "nama_peserta",
    "nomor_induk",
    "nama_program",
    "durasi_program",
    "tanggal_terbit",
    "nomor_sertifikat",
];

/// Recognized but optional placeholder names.
pub const OPTIONAL_PLACEHOLDERS: [&str; 2] = ["nama_instruktur", "foto_peserta"];

/// Name of the photo placeholder handled by the image anchor path.
pub const PHOTO_PLACEHOLDER: &str = "foto_peserta";

lazy_static! {
    static ref RE_DOUBLE: Regex = Regex::new(r"\{\{([^{}]+)\}\}").unwrap();
    // Malformed double-brace span with nested braces in its body, e.g.
    // `{{nama_{peserta}}}`. Discarded, but masked so its fragments do not
    // leak into the single-brace count.
    static ref RE_DOUBLE_NESTED: Regex =
        Regex::new(r"\{\{[^{}]*(?:\{[^{}]*\}[^{}]*)+\}\}").unwrap();
    static ref RE_SINGLE: Regex = Regex::new(r"\{([^{}]+)\}").unwrap();
    static ref RE_NAME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_.]*$").unwrap();
}

/// Outcome of template validation.
#[derive(Debug, Serialize)]
pub struct TemplateValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Active delimiter syntax, absent when no tokens were found.
    pub syntax: Option<DelimiterSyntax>,
    pub tokens: Vec<PlaceholderToken>,
    /// True when structural extraction failed and discovery fell back to
    /// scanning the raw document part.
    pub degraded_discovery: bool,
}

impl TemplateValidation {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
            syntax: None,
            tokens: Vec::new(),
            degraded_discovery: false,
        }
    }

    pub fn has_token(&self, name: &str) -> bool {
        self.tokens.iter().any(|t| t.name == name)
    }
}

/// Stateless template validator.
pub struct TemplateValidator;

impl TemplateValidator {
    /// Extract the template's plain text for placeholder discovery.
    ///
    /// Structural extraction goes through the XML event stream; when the
    /// main part is not well-formed the raw bytes are scanned lossily
    /// instead (discovery only, never used for rendering).
    pub fn parse(bytes: &[u8]) -> Result<(String, bool), String> {
        let package =
            DocxPackage::open(bytes).map_err(|e| format!("template container invalid: {e}"))?;

        match package.main_xml().and_then(|xml| extract_text(&xml)) {
            Ok(text) => Ok((text, false)),
            Err(e) => {
                log::warn!("Structural text extraction failed, scanning raw part: {e}");
                let raw = package
                    .main_raw()
                    .ok_or_else(|| "template has no document part".to_string())?;
                Ok((String::from_utf8_lossy(raw).into_owned(), true))
            }
        }
    }

    /// Discover placeholder tokens and pick the active delimiter syntax.
    ///
    /// The syntax with more matches wins; double-brace wins ties. Tokens
    /// of the losing syntax are returned separately so the caller can
    /// warn about them.
    pub fn extract_placeholders(
        text: &str,
    ) -> (Option<DelimiterSyntax>, Vec<PlaceholderToken>, Vec<String>) {
        let double_matches = collect_tokens(&RE_DOUBLE, text, DelimiterSyntax::DoubleBrace);

        // Mask double-brace spans, intact and malformed-nested alike, so
        // the single-brace regex does not see their inner braces.
        let mut masked = text.to_string();
        for re in [&*RE_DOUBLE, &*RE_DOUBLE_NESTED] {
            for m in re.find_iter(text) {
                masked.replace_range(m.range(), &" ".repeat(m.len()));
            }
        }
        let single_matches = collect_tokens(&RE_SINGLE, &masked, DelimiterSyntax::SingleBrace);

        if double_matches.is_empty() && single_matches.is_empty() {
            return (None, Vec::new(), Vec::new());
        }

        let (active, minority) = if single_matches.len() > double_matches.len() {
            (single_matches, double_matches)
        } else {
            (double_matches, single_matches)
        };
        let syntax = active[0].syntax;
        let minority_names = minority.into_iter().map(|t| t.name).collect();
        (Some(syntax), dedup_tokens(active), minority_names)
    }

    /// Classify tokens and produce the validation report.
    pub fn validate(bytes: &[u8]) -> TemplateValidation {
        let (text, degraded_discovery) = match Self::parse(bytes) {
            Ok(parsed) => parsed,
            Err(e) => return TemplateValidation::invalid(e),
        };

        let (syntax, mut tokens, minority) = Self::extract_placeholders(&text);
        let Some(syntax) = syntax else {
            return TemplateValidation::invalid(
                "template contains no placeholder tokens of either syntax",
            );
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if degraded_discovery {
            warnings.push(
                "structural extraction failed; placeholders discovered from raw XML".to_string(),
            );
        }
        for name in minority {
            warnings.push(format!(
                "token '{name}' uses the inactive delimiter syntax and will not be substituted"
            ));
        }

        for token in tokens.iter_mut() {
            if REQUIRED_PLACEHOLDERS.contains(&token.name.as_str()) {
                token.required = true;
            } else if !OPTIONAL_PLACEHOLDERS.contains(&token.name.as_str()) {
                warnings.push(format!("unknown placeholder '{}'", token.name));
            }
        }

        for required in REQUIRED_PLACEHOLDERS {
            if !tokens.iter().any(|t| t.name == required) {
                errors.push(format!("missing required placeholder '{required}'"));
            }
        }
        for optional in OPTIONAL_PLACEHOLDERS {
            if !tokens.iter().any(|t| t.name == optional) {
                warnings.push(format!("optional placeholder '{optional}' not present"));
            }
        }

        TemplateValidation {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            syntax: Some(syntax),
            tokens,
            degraded_discovery,
        }
    }
}

fn collect_tokens(re: &Regex, text: &str, syntax: DelimiterSyntax) -> Vec<PlaceholderToken> {
    let mut tokens = Vec::new();
    for caps in re.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let name = caps[1].trim().to_string();
        // Malformed names (nested delimiters are already excluded by the
        // pattern, this drops empties and stray punctuation).
        if !RE_NAME.is_match(&name) {
            continue;
        }
        tokens.push(PlaceholderToken {
            name,
            syntax,
            required: false,
            context: context_snippet(text, whole.start(), whole.end()),
        });
    }
    tokens
}

fn dedup_tokens(tokens: Vec<PlaceholderToken>) -> Vec<PlaceholderToken> {
    let mut seen = std::collections::HashSet::new();
    tokens
        .into_iter()
        .filter(|t| seen.insert(t.name.clone()))
        .collect()
}

fn context_snippet(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(19)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(20)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    text[from..to].replace('\n', " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sertifikat::docx::minimal_docx;

    fn template_with(lines: &[&str]) -> Vec<u8> {
        minimal_docx(&lines.iter().map(|l| l.to_string()).collect::<Vec<_>>()).unwrap()
    }

    fn full_template(syntax: DelimiterSyntax) -> Vec<u8> {
        let lines: Vec<String> = REQUIRED_PLACEHOLDERS
            .iter()
            .chain(OPTIONAL_PLACEHOLDERS.iter())
            .map(|name| format!("Field: {}", syntax.token(name)))
            .collect();
        minimal_docx(&lines).unwrap()
    }

    #[test]
    fn test_valid_template_with_all_placeholders() {
        let validation = TemplateValidator::validate(&full_template(DelimiterSyntax::DoubleBrace));
        assert!(validation.is_valid, "errors: {:?}", validation.errors);
        assert_eq!(validation.syntax, Some(DelimiterSyntax::DoubleBrace));
        assert!(validation.errors.is_empty());
        assert!(validation.has_token("foto_peserta"));
    }

    #[test]
    fn test_single_brace_template_validates() {
        let validation = TemplateValidator::validate(&full_template(DelimiterSyntax::SingleBrace));
        assert!(validation.is_valid);
        assert_eq!(validation.syntax, Some(DelimiterSyntax::SingleBrace));
    }

    #[test]
    fn test_missing_required_placeholder_lists_name() {
        let docx = template_with(&[
            "{{nama_peserta}} {{nomor_induk}} {{nama_program}}",
            "{{durasi_program}} {{tanggal_terbit}}",
        ]);
        let validation = TemplateValidator::validate(&docx);
        assert!(!validation.is_valid);
        assert!(validation
            .errors
            .iter()
            .any(|e| e.contains("nomor_sertifikat")));
    }

    #[test]
    fn test_missing_optional_is_warning_only() {
        let lines: Vec<String> = REQUIRED_PLACEHOLDERS
            .iter()
            .map(|n| format!("{{{{{n}}}}}"))
            .collect();
        let docx = minimal_docx(&lines).unwrap();
        let validation = TemplateValidator::validate(&docx);
        assert!(validation.is_valid);
        assert!(validation
            .warnings
            .iter()
            .any(|w| w.contains("foto_peserta")));
    }

    #[test]
    fn test_unknown_placeholder_is_warning() {
        let mut lines: Vec<String> = REQUIRED_PLACEHOLDERS
            .iter()
            .map(|n| format!("{{{{{n}}}}}"))
            .collect();
        lines.push("{{warna_favorit}}".to_string());
        let validation = TemplateValidator::validate(&minimal_docx(&lines).unwrap());
        assert!(validation.is_valid);
        assert!(validation
            .warnings
            .iter()
            .any(|w| w.contains("warna_favorit")));
    }

    #[test]
    fn test_no_tokens_is_invalid() {
        let docx = template_with(&["Sertifikat kosong tanpa placeholder"]);
        let validation = TemplateValidator::validate(&docx);
        assert!(!validation.is_valid);
        assert!(validation.syntax.is_none());
    }

    #[test]
    fn test_garbage_bytes_is_invalid() {
        let validation = TemplateValidator::validate(b"not an archive");
        assert!(!validation.is_valid);
        assert!(validation.errors[0].contains("container"));
    }

    #[test]
    fn test_majority_syntax_wins() {
        let docx = template_with(&["{{a}} {{b}} {{c}}", "{x}"]);
        let (syntax, tokens, minority) = {
            let (text, _) = TemplateValidator::parse(&docx).unwrap();
            TemplateValidator::extract_placeholders(&text)
        };
        assert_eq!(syntax, Some(DelimiterSyntax::DoubleBrace));
        assert_eq!(tokens.len(), 3);
        assert_eq!(minority, vec!["x".to_string()]);
    }

    #[test]
    fn test_tie_prefers_double_brace() {
        let docx = template_with(&["{{a}}", "{b}"]);
        let (text, _) = TemplateValidator::parse(&docx).unwrap();
        let (syntax, _, _) = TemplateValidator::extract_placeholders(&text);
        assert_eq!(syntax, Some(DelimiterSyntax::DoubleBrace));
    }

    #[test]
    fn test_nested_fragment_does_not_sway_syntax_vote() {
        // Without masking the malformed span, its inner `{x}` would count
        // as a second single-brace token and flip the vote.
        let docx = template_with(&["{{nama_program}} {{nama_{x}}} {durasi}"]);
        let (text, _) = TemplateValidator::parse(&docx).unwrap();
        let (syntax, tokens, _) = TemplateValidator::extract_placeholders(&text);
        assert_eq!(syntax, Some(DelimiterSyntax::DoubleBrace));
        assert!(tokens.iter().all(|t| t.name != "x"));
    }

    #[test]
    fn test_nested_delimiters_discarded() {
        let docx = template_with(&["{{nama_{peserta}}}", "{{nama_program}}"]);
        let (text, _) = TemplateValidator::parse(&docx).unwrap();
        let (_, tokens, _) = TemplateValidator::extract_placeholders(&text);
        assert!(tokens.iter().all(|t| !t.name.contains('{')));
    }

    #[test]
    fn test_context_snippet_present() {
        let docx = template_with(&["Diberikan kepada {{nama_peserta}} atas partisipasi"]);
        let (text, _) = TemplateValidator::parse(&docx).unwrap();
        let (_, tokens, _) = TemplateValidator::extract_placeholders(&text);
        let token = tokens.iter().find(|t| t.name == "nama_peserta").unwrap();
        assert!(token.context.contains("Diberikan") || token.context.contains("kepada"));
    }
}
