//! OOXML container engine.
//!
//! Low-level primitives over the DOCX package format: archive IO, text
//! extraction, healing of placeholders split across text runs, in-place
//! substitution, photo anchor injection, multi-document merge, and a
//! minimal single-part document emitter for the degraded render path.

use lazy_static::lazy_static;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::io::{Cursor, Read, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const DOCX_MAGIC: &[u8] = b"PK\x03\x04";
pub const PDF_MAGIC: &[u8] = b"%PDF-";

const MAIN_PART: &str = "word/document.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// EMUs per pixel at 96 DPI.
const EMU_PER_PX: u64 = 9525;

/// Errors from the container layer.
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("container is not a valid archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive entry read failed: {0}")]
    EntryIo(#[source] std::io::Error),
    #[error("missing document part: {0}")]
    MissingPart(String),
    #[error("document part is not valid UTF-8")]
    Encoding,
    #[error("document XML is malformed: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// An unpacked DOCX archive held as ordered (name, bytes) entries so a
/// rebuild preserves the original part order.
pub struct DocxPackage {
    entries: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    /// Unpack DOCX bytes. Fails if the bytes are not a readable ZIP
    /// archive or the main document part is absent.
    pub fn open(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(DocxError::EntryIo)?;
            entries.push((name, data));
        }

        let package = Self { entries };
        if package.part(MAIN_PART).is_none() {
            return Err(DocxError::MissingPart(MAIN_PART.to_string()));
        }
        Ok(package)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    /// Replace an existing part or append a new one.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = data;
        } else {
            self.entries.push((name.to_string(), data));
        }
    }

    /// The main document part as a UTF-8 string.
    pub fn main_xml(&self) -> Result<String, DocxError> {
        let raw = self
            .part(MAIN_PART)
            .ok_or_else(|| DocxError::MissingPart(MAIN_PART.to_string()))?;
        String::from_utf8(raw.to_vec()).map_err(|_| DocxError::Encoding)
    }

    pub fn set_main_xml(&mut self, xml: String) {
        self.set_part(MAIN_PART, xml.into_bytes());
    }

    /// Raw main part bytes for the lossy discovery fallback.
    pub fn main_raw(&self) -> Option<&[u8]> {
        self.part(MAIN_PART)
    }

    /// Repack the entries into DOCX bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in self.entries {
            writer.start_file(name, options)?;
            writer.write_all(&data).map_err(DocxError::EntryIo)?;
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Extract the document's plain text: `w:t` run contents, newlines at
/// paragraph ends and explicit breaks.
pub fn extract_text(xml: &str) -> Result<String, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"w:br" => out.push('\n'),
            Ok(Event::Text(ref t)) if in_text_run => match t.unescape() {
                Ok(text) => out.push_str(&text),
                // Keep the raw bytes when an entity is malformed.
                Err(_) => out.push_str(&String::from_utf8_lossy(t)),
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(DocxError::Xml(e)),
        }
    }
    Ok(out)
}

lazy_static! {
    // A double-brace token whose braces or body were split across runs:
    // `{`, optional run-boundary tags, `{`, body text interleaved with
    // tags, `}`, optional tags, `}`.
    static ref RE_BROKEN_DOUBLE: Regex = Regex::new(
        r"(?s)\{(?:<[^>]+>|\s)*\{(?:[^{}<]|<[^>]+>)*?\}(?:<[^>]+>|\s)*\}"
    )
    .unwrap();
    // A single-brace token with at least one tag inside its body.
    static ref RE_BROKEN_SINGLE: Regex =
        Regex::new(r"(?s)\{[^{}<]*(?:<[^>]+>[^{}<]*)+\}").unwrap();
    static ref RE_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Join placeholder tokens that word processors split across adjacent
/// text runs, by stripping the run-boundary markup inside a detected
/// token span. The interior tags close one run and open the next, so
/// removing the whole group leaves balanced XML with the token sitting
/// in the first run.
pub fn heal_split_placeholders(xml: &str) -> String {
    let pass = |re: &Regex, input: &str| -> String {
        re.replace_all(input, |caps: &regex::Captures| {
            let span = caps.get(0).unwrap().as_str();
            // Never join across paragraphs; a stray brace pair spanning
            // paragraphs is not a placeholder.
            if span.contains("</w:p>") || !span.contains('<') {
                span.to_string()
            } else {
                RE_TAG.replace_all(span, "").into_owned()
            }
        })
        .into_owned()
    };

    let healed = pass(&RE_BROKEN_DOUBLE, xml);
    pass(&RE_BROKEN_SINGLE, &healed)
}

/// Replace literal token occurrences with XML-escaped values.
///
/// `pairs` maps the full token literal (delimiters included) to its
/// replacement value. Non-token XML is byte-preserved.
pub fn substitute_tokens(xml: &str, pairs: &[(String, String)]) -> String {
    let mut out = xml.to_string();
    for (token, value) in pairs {
        if out.contains(token.as_str()) {
            out = out.replace(token.as_str(), &escape(value.as_str()));
        }
    }
    out
}

/// Inline `w:drawing` markup for an embedded picture at a fixed extent.
fn drawing_xml(rel_id: &str, name: &str, cx: u64, cy: u64) -> String {
    format!(
        concat!(
            r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0" "#,
            r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="1001" name="{name}"/>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
            r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="1001" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#
        ),
        cx = cx,
        cy = cy,
        name = name,
        rel = rel_id,
    )
}

/// Replace the first occurrence of `token` with an inline picture run
/// carrying `jpeg_bytes` scaled to `width_px` x `height_px`; remaining
/// occurrences are blanked. Registers the media part, its relationship,
/// and the `jpeg` content-type default.
pub fn embed_photo(
    package: &mut DocxPackage,
    token: &str,
    jpeg_bytes: &[u8],
    width_px: u32,
    height_px: u32,
) -> Result<bool, DocxError> {
    let xml = package.main_xml()?;
    if !xml.contains(token) {
        return Ok(false);
    }

    let rel_id = "rIdFotoPeserta";
    let media_name = "word/media/foto_peserta.jpeg";
    let cx = width_px as u64 * EMU_PER_PX;
    let cy = height_px as u64 * EMU_PER_PX;

    // The token sits inside a `w:t`; splice the run so the drawing lands
    // in its own sibling run.
    let splice = format!(
        r#"</w:t></w:r><w:r>{}</w:r><w:r><w:t xml:space="preserve">"#,
        drawing_xml(rel_id, "foto-peserta", cx, cy)
    );
    let replaced = xml.replacen(token, &splice, 1).replace(token, "");
    package.set_main_xml(replaced);

    package.set_part(media_name, jpeg_bytes.to_vec());
    add_relationship(package, rel_id, REL_TYPE_IMAGE, "media/foto_peserta.jpeg")?;
    ensure_content_type_default(package, "jpeg", "image/jpeg")?;
    Ok(true)
}

const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const EMPTY_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"</Relationships>"#
);

fn add_relationship(
    package: &mut DocxPackage,
    id: &str,
    rel_type: &str,
    target: &str,
) -> Result<(), DocxError> {
    let rels = match package.part(RELS_PART) {
        Some(raw) => String::from_utf8(raw.to_vec()).map_err(|_| DocxError::Encoding)?,
        None => EMPTY_RELS.to_string(),
    };
    let entry = format!(r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}"/>"#);
    let updated = match rels.rfind("</Relationships>") {
        Some(pos) => {
            let mut s = rels.clone();
            s.insert_str(pos, &entry);
            s
        }
        None => return Err(DocxError::MissingPart(RELS_PART.to_string())),
    };
    package.set_part(RELS_PART, updated.into_bytes());
    Ok(())
}

fn ensure_content_type_default(
    package: &mut DocxPackage,
    extension: &str,
    mime: &str,
) -> Result<(), DocxError> {
    let raw = package
        .part(CONTENT_TYPES_PART)
        .ok_or_else(|| DocxError::MissingPart(CONTENT_TYPES_PART.to_string()))?;
    let types = String::from_utf8(raw.to_vec()).map_err(|_| DocxError::Encoding)?;
    if types.contains(&format!(r#"Extension="{extension}""#)) {
        return Ok(());
    }
    let entry = format!(r#"<Default Extension="{extension}" ContentType="{mime}"/>"#);
    let updated = match types.rfind("</Types>") {
        Some(pos) => {
            let mut s = types.clone();
            s.insert_str(pos, &entry);
            s
        }
        None => return Err(DocxError::MissingPart(CONTENT_TYPES_PART.to_string())),
    };
    package.set_part(CONTENT_TYPES_PART, updated.into_bytes());
    Ok(())
}

/// Emit a minimal single-part DOCX from plain paragraphs. Used by the
/// degraded render path and by test fixtures.
pub fn minimal_docx(paragraphs: &[String]) -> Result<Vec<u8>, DocxError> {
    let mut body = String::new();
    for line in paragraphs {
        body.push_str(r#"<w:p><w:r><w:t xml:space="preserve">"#);
        body.push_str(&escape(line.as_str()));
        body.push_str("</w:t></w:r></w:p>");
    }

    let document = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<w:body>{}<w:sectPr/></w:body></w:document>"#
        ),
        body
    );

    let content_types = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Override PartName="/word/document.xml" "#,
        r#"ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"</Types>"#
    );

    let root_rels = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" "#,
        r#"Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" "#,
        r#"Target="word/document.xml"/></Relationships>"#
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file(CONTENT_TYPES_PART, options)?;
    writer
        .write_all(content_types.as_bytes())
        .map_err(DocxError::EntryIo)?;
    writer.start_file("_rels/.rels", options)?;
    writer
        .write_all(root_rels.as_bytes())
        .map_err(DocxError::EntryIo)?;
    writer.start_file(MAIN_PART, options)?;
    writer
        .write_all(document.as_bytes())
        .map_err(DocxError::EntryIo)?;
    writer.start_file(RELS_PART, options)?;
    writer
        .write_all(EMPTY_RELS.as_bytes())
        .map_err(DocxError::EntryIo)?;
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

lazy_static! {
    static ref RE_RELATIONSHIP: Regex = Regex::new(r"<Relationship\b[^>]*/?>").unwrap();
    static ref RE_ATTR_ID: Regex = Regex::new(r#"Id="([^"]+)""#).unwrap();
    static ref RE_ATTR_TYPE: Regex = Regex::new(r#"Type="([^"]+)""#).unwrap();
    static ref RE_ATTR_TARGET: Regex = Regex::new(r#"Target="([^"]+)""#).unwrap();
}

/// Concatenate rendered documents into one multi-subject document.
///
/// The first document is the base; each subsequent document contributes
/// its body paragraphs after a page break. Image relationships are
/// re-keyed and their media copied under fresh names so rIds never
/// collide.
pub fn merge_documents(docs: &[Vec<u8>]) -> Result<Vec<u8>, DocxError> {
    let first = docs
        .first()
        .ok_or_else(|| DocxError::MissingPart("no documents to merge".to_string()))?;
    let mut base = DocxPackage::open(first)?;
    let mut base_xml = base.main_xml()?;

    for (index, doc) in docs.iter().enumerate().skip(1) {
        let package = DocxPackage::open(doc)?;
        let mut fragment = body_fragment(&package.main_xml()?)?;

        // Re-key this document's image relationships into the base.
        if let Some(raw) = package.part(RELS_PART) {
            let rels = String::from_utf8(raw.to_vec()).map_err(|_| DocxError::Encoding)?;
            let mut counter = 0usize;
            for rel_tag in RE_RELATIONSHIP.find_iter(&rels) {
                let tag = rel_tag.as_str();
                let is_image = RE_ATTR_TYPE
                    .captures(tag)
                    .map(|c| c[1].ends_with("/image"))
                    .unwrap_or(false);
                if !is_image {
                    continue;
                }
                let (Some(id), Some(target)) =
                    (RE_ATTR_ID.captures(tag), RE_ATTR_TARGET.captures(tag))
                else {
                    continue;
                };
                let old_id = id[1].to_string();
                let old_target = target[1].to_string();
                let source_part = format!("word/{old_target}");
                let Some(media) = package.part(&source_part).map(|m| m.to_vec()) else {
                    continue;
                };

                counter += 1;
                let new_id = format!("rIdMerge{index}x{counter}");
                let file_name = old_target.rsplit('/').next().unwrap_or("image.bin");
                let new_target = format!("media/merge{index}_{file_name}");
                base.set_part(&format!("word/{new_target}"), media);
                add_relationship(&mut base, &new_id, REL_TYPE_IMAGE, &new_target)?;
                if let Some(ext) = file_name.rsplit('.').next() {
                    let mime = match ext {
                        "png" => "image/png",
                        _ => "image/jpeg",
                    };
                    ensure_content_type_default(&mut base, ext, mime)?;
                }
                fragment = fragment.replace(
                    &format!(r#"r:embed="{old_id}""#),
                    &format!(r#"r:embed="{new_id}""#),
                );
            }
        }

        let insertion = format!(
            r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>{fragment}"#
        );
        base_xml = insert_before_section_end(&base_xml, &insertion)?;
    }

    base.set_main_xml(base_xml);
    base.into_bytes()
}

/// The inner body markup of a document, without its trailing section
/// properties.
fn body_fragment(xml: &str) -> Result<String, DocxError> {
    let open = xml
        .find("<w:body")
        .and_then(|pos| xml[pos..].find('>').map(|end| pos + end + 1))
        .ok_or_else(|| DocxError::MissingPart("w:body".to_string()))?;
    let close = xml
        .rfind("</w:body>")
        .ok_or_else(|| DocxError::MissingPart("w:body".to_string()))?;
    let mut inner = &xml[open..close];
    if let Some(sect) = inner.rfind("<w:sectPr") {
        inner = &inner[..sect];
    }
    Ok(inner.to_string())
}

fn insert_before_section_end(xml: &str, insertion: &str) -> Result<String, DocxError> {
    let pos = xml
        .rfind("<w:sectPr")
        .or_else(|| xml.rfind("</w:body>"))
        .ok_or_else(|| DocxError::MissingPart("w:body".to_string()))?;
    let mut out = xml.to_string();
    out.insert_str(pos, insertion);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_body(runs: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
                r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
                r#"<w:body>{}<w:sectPr/></w:body></w:document>"#
            ),
            runs
        )
    }

    #[test]
    fn test_extract_text_joins_runs() {
        let xml = wrap_body(
            r#"<w:p><w:r><w:t>Halo </w:t></w:r><w:r><w:t>dunia</w:t></w:r></w:p>"#,
        );
        let text = extract_text(&xml).unwrap();
        assert_eq!(text.trim(), "Halo dunia");
    }

    #[test]
    fn test_extract_text_unescapes_entities() {
        let xml = wrap_body(r#"<w:p><w:r><w:t>Tom &amp; Jerry &lt;3</w:t></w:r></w:p>"#);
        let text = extract_text(&xml).unwrap();
        assert_eq!(text.trim(), "Tom & Jerry <3");
    }

    #[test]
    fn test_heal_split_double_brace() {
        let xml = r#"<w:r><w:t>{{na</w:t></w:r><w:r><w:t>ma_peserta}}</w:t></w:r>"#;
        let healed = heal_split_placeholders(xml);
        assert!(healed.contains("{{nama_peserta}}"));
        assert!(healed.starts_with("<w:r><w:t>"));
        assert!(healed.ends_with("</w:t></w:r>"));
    }

    #[test]
    fn test_heal_split_opening_braces() {
        let xml = r#"<w:t>{</w:t></w:r><w:r><w:t>{nomor}}</w:t>"#;
        let healed = heal_split_placeholders(xml);
        assert!(healed.contains("{{nomor}}"));
    }

    #[test]
    fn test_heal_does_not_cross_paragraphs() {
        let xml = r#"<w:p><w:r><w:t>set {a</w:t></w:r></w:p><w:p><w:r><w:t>b} close</w:t></w:r></w:p>"#;
        let healed = heal_split_placeholders(xml);
        assert_eq!(healed, xml);
    }

    #[test]
    fn test_heal_leaves_intact_tokens_alone() {
        let xml = r#"<w:t>{{nama_peserta}} dan {nomor_induk}</w:t>"#;
        assert_eq!(heal_split_placeholders(xml), xml);
    }

    #[test]
    fn test_substitute_escapes_xml() {
        let xml = r#"<w:t>{{nama_peserta}}</w:t>"#;
        let pairs = vec![(
            "{{nama_peserta}}".to_string(),
            "Tom & Jerry <3".to_string(),
        )];
        let out = substitute_tokens(xml, &pairs);
        assert_eq!(out, r#"<w:t>Tom &amp; Jerry &lt;3</w:t>"#);
    }

    #[test]
    fn test_minimal_docx_roundtrip() {
        let docx = minimal_docx(&["Sertifikat".to_string(), "Siti".to_string()]).unwrap();
        assert!(docx.starts_with(DOCX_MAGIC));
        let package = DocxPackage::open(&docx).unwrap();
        let text = extract_text(&package.main_xml().unwrap()).unwrap();
        assert!(text.contains("Sertifikat"));
        assert!(text.contains("Siti"));
    }

    #[test]
    fn test_embed_photo_registers_parts() {
        let docx = minimal_docx(&["Foto: {{foto_peserta}}".to_string()]).unwrap();
        let mut package = DocxPackage::open(&docx).unwrap();
        let embedded =
            embed_photo(&mut package, "{{foto_peserta}}", b"\xFF\xD8\xFFfake", 150, 200).unwrap();
        assert!(embedded);

        let xml = package.main_xml().unwrap();
        assert!(xml.contains("w:drawing"));
        assert!(xml.contains(r#"r:embed="rIdFotoPeserta""#));
        assert!(!xml.contains("{{foto_peserta}}"));
        assert!(package.part("word/media/foto_peserta.jpeg").is_some());

        let rels =
            String::from_utf8(package.part("word/_rels/document.xml.rels").unwrap().to_vec())
                .unwrap();
        assert!(rels.contains("media/foto_peserta.jpeg"));
    }

    #[test]
    fn test_embed_photo_extent_is_fixed_footprint() {
        let docx = minimal_docx(&["{{foto_peserta}}".to_string()]).unwrap();
        let mut package = DocxPackage::open(&docx).unwrap();
        embed_photo(&mut package, "{{foto_peserta}}", b"fake", 150, 200).unwrap();
        let xml = package.main_xml().unwrap();
        // 150 px * 9525 EMU, 200 px * 9525 EMU
        assert!(xml.contains(r#"cx="1428750""#));
        assert!(xml.contains(r#"cy="1905000""#));
    }

    #[test]
    fn test_embed_photo_absent_token() {
        let docx = minimal_docx(&["no photo here".to_string()]).unwrap();
        let mut package = DocxPackage::open(&docx).unwrap();
        let embedded = embed_photo(&mut package, "{{foto_peserta}}", b"fake", 150, 200).unwrap();
        assert!(!embedded);
    }

    #[test]
    fn test_merge_documents_appends_bodies() {
        let a = minimal_docx(&["Sertifikat Siti".to_string()]).unwrap();
        let b = minimal_docx(&["Sertifikat Budi".to_string()]).unwrap();
        let merged = merge_documents(&[a, b]).unwrap();

        let package = DocxPackage::open(&merged).unwrap();
        let xml = package.main_xml().unwrap();
        let text = extract_text(&xml).unwrap();
        assert!(text.contains("Sertifikat Siti"));
        assert!(text.contains("Sertifikat Budi"));
        assert!(xml.contains(r#"<w:br w:type="page"/>"#));
        assert_eq!(text.matches("Sertifikat Siti").count(), 1);
        assert_eq!(text.matches("Sertifikat Budi").count(), 1);
    }

    #[test]
    fn test_merge_rekeys_image_relationships() {
        let a = minimal_docx(&["Siti: {{foto_peserta}}".to_string()]).unwrap();
        let mut pkg_a = DocxPackage::open(&a).unwrap();
        embed_photo(&mut pkg_a, "{{foto_peserta}}", b"photo-a", 150, 200).unwrap();
        let a = pkg_a.into_bytes().unwrap();

        let b = minimal_docx(&["Budi: {{foto_peserta}}".to_string()]).unwrap();
        let mut pkg_b = DocxPackage::open(&b).unwrap();
        embed_photo(&mut pkg_b, "{{foto_peserta}}", b"photo-b", 150, 200).unwrap();
        let b = pkg_b.into_bytes().unwrap();

        let merged = merge_documents(&[a, b]).unwrap();
        let package = DocxPackage::open(&merged).unwrap();
        let xml = package.main_xml().unwrap();
        assert!(xml.contains(r#"r:embed="rIdFotoPeserta""#));
        assert!(xml.contains(r#"r:embed="rIdMerge1x1""#));
        assert_eq!(
            package.part("word/media/merge1_foto_peserta.jpeg").unwrap(),
            b"photo-b"
        );
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(DocxPackage::open(b"definitely not a zip").is_err());
    }
}
