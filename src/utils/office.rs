//! Text extraction for the OOXML formats (DOCX, PPTX).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{ExtractError, ExtractResult};

/// Extract text from a `.docx` file, one paragraph per line.
///
/// Headers come first, then the body, then footers. Table cells, hyperlinks,
/// tracked insertions and content controls are walked in document order.
pub fn extract_text_from_docx(path: &Path) -> ExtractResult<String> {
    info!("Extracting text from DOCX: {:?}", path);

    let bytes = fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let section = &docx.document.section_property;

    let mut lines = Vec::new();
    for (_, header) in [&section.header, &section.first_header, &section.even_header]
        .into_iter()
        .flatten()
    {
        for child in &header.children {
            match child {
                docx_rs::HeaderChild::Paragraph(para) => lines.push(paragraph_text(para)),
                docx_rs::HeaderChild::Table(table) => table_text(table, &mut lines),
                docx_rs::HeaderChild::StructuredDataTag(sdt) => sdt_blocks(sdt, &mut lines),
            }
        }
    }

    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => lines.push(paragraph_text(para)),
            docx_rs::DocumentChild::Table(table) => table_text(table, &mut lines),
            docx_rs::DocumentChild::StructuredDataTag(sdt) => sdt_blocks(sdt, &mut lines),
            _ => {}
        }
    }

    for (_, footer) in [&section.footer, &section.first_footer, &section.even_footer]
        .into_iter()
        .flatten()
    {
        for child in &footer.children {
            match child {
                docx_rs::FooterChild::Paragraph(para) => lines.push(paragraph_text(para)),
                docx_rs::FooterChild::Table(table) => table_text(table, &mut lines),
                docx_rs::FooterChild::StructuredDataTag(sdt) => sdt_blocks(sdt, &mut lines),
            }
        }
    }

    Ok(lines.join("\n"))
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        push_inline(child, &mut text);
    }
    text
}

fn push_inline(child: &docx_rs::ParagraphChild, text: &mut String) {
    match child {
        docx_rs::ParagraphChild::Run(run) => push_run(run, text),
        docx_rs::ParagraphChild::Insert(insert) => {
            for ic in &insert.children {
                if let docx_rs::InsertChild::Run(run) = ic {
                    push_run(run, text);
                }
            }
        }
        docx_rs::ParagraphChild::Hyperlink(link) => {
            for lc in &link.children {
                push_inline(lc, text);
            }
        }
        docx_rs::ParagraphChild::StructuredDataTag(sdt) => sdt_inline(sdt, text),
        _ => {}
    }
}

fn push_run(run: &docx_rs::Run, text: &mut String) {
    for rc in &run.children {
        match rc {
            docx_rs::RunChild::Text(t) => text.push_str(&t.text),
            docx_rs::RunChild::Tab(_) => text.push('\t'),
            docx_rs::RunChild::Break(_) | docx_rs::RunChild::CarriageReturn(_) => text.push('\n'),
            _ => {}
        }
    }
}

/// Content control inside a paragraph.
fn sdt_inline(sdt: &docx_rs::StructuredDataTag, text: &mut String) {
    for child in &sdt.children {
        match child {
            docx_rs::StructuredDataTagChild::Run(run) => push_run(run, text),
            docx_rs::StructuredDataTagChild::Paragraph(para) => text.push_str(&paragraph_text(para)),
            docx_rs::StructuredDataTagChild::StructuredDataTag(inner) => sdt_inline(inner, text),
            _ => {}
        }
    }
}

/// Content control at block level (body, header, cell); loose runs form one line.
fn sdt_blocks(sdt: &docx_rs::StructuredDataTag, lines: &mut Vec<String>) {
    let mut loose = String::new();
    for child in &sdt.children {
        match child {
            docx_rs::StructuredDataTagChild::Run(run) => push_run(run, &mut loose),
            docx_rs::StructuredDataTagChild::Paragraph(para) => {
                flush_line(&mut loose, lines);
                lines.push(paragraph_text(para));
            }
            docx_rs::StructuredDataTagChild::Table(table) => {
                flush_line(&mut loose, lines);
                table_text(table, lines);
            }
            docx_rs::StructuredDataTagChild::StructuredDataTag(inner) => {
                flush_line(&mut loose, lines);
                sdt_blocks(inner, lines);
            }
            _ => {}
        }
    }
    flush_line(&mut loose, lines);
}

fn flush_line(pending: &mut String, lines: &mut Vec<String>) {
    if !pending.is_empty() {
        lines.push(std::mem::take(pending));
    }
}

fn table_text(table: &docx_rs::Table, lines: &mut Vec<String>) {
    for docx_rs::TableChild::TableRow(row) in &table.rows {
        for docx_rs::TableRowChild::TableCell(cell) in &row.cells {
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(para) => lines.push(paragraph_text(para)),
                    docx_rs::TableCellContent::Table(inner) => table_text(inner, lines),
                    docx_rs::TableCellContent::StructuredDataTag(sdt) => sdt_blocks(sdt, lines),
                    _ => {}
                }
            }
        }
    }
}

static RE_SLIDE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<p:sldId\b[^>]*\br:id="([^"]+)""#).unwrap());
static RE_RELATIONSHIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Relationship\b[^>]*>").unwrap());
static RE_REL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bId="([^"]+)""#).unwrap());
static RE_REL_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bTarget="([^"]+)""#).unwrap());
static RE_SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());
static RE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p:sp\b.*?</p:sp>").unwrap());
static RE_TEXT_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<p:txBody\b.*?</p:txBody>").unwrap());
static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<a:p\b[^>]*/>|<a:p\b[^>]*>.*?</a:p>").unwrap());
static RE_RUN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<a:t\b[^>]*/>|<a:t\b[^>]*>(.*?)</a:t>|<a:br\b[^>]*/>").unwrap());
static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(amp|lt|gt|quot|apos|#[0-9]+|#x[0-9A-Fa-f]+);").unwrap());

/// Extract text from a `.pptx` file.
///
/// Slides are visited in presentation order and, within a slide, every shape
/// with a text body contributes its text followed by a blank line.
pub fn extract_text_from_pptx(path: &Path) -> ExtractResult<String> {
    info!("Extracting text from PPTX: {:?}", path);

    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut archive = ZipArchive::new(file)?;

    let slides = slide_order(&mut archive)?;
    debug!("PPTX has {} slides", slides.len());

    let mut text = String::new();
    for slide in &slides {
        let xml = read_part(&mut archive, slide)?;
        for shape in shape_texts(&xml) {
            text.push_str(&shape);
            text.push_str("\n\n");
        }
    }

    Ok(text)
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ExtractResult<String> {
    let mut part = archive.by_name(name)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ExtractError::Other(format!("unreadable part {}: {}", name, e)))?;
    Ok(xml)
}

/// Slide part names in presentation order.
///
/// Uses the slide list of `ppt/presentation.xml`; when that cannot be
/// resolved, falls back to the numeric order of `ppt/slides/slideN.xml`.
fn slide_order<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> ExtractResult<Vec<String>> {
    if let (Ok(presentation), Ok(rels)) = (
        read_part(archive, "ppt/presentation.xml"),
        read_part(archive, "ppt/_rels/presentation.xml.rels"),
    ) {
        let targets = relationship_targets(&rels);
        let ordered: Option<Vec<String>> = RE_SLIDE_ID
            .captures_iter(&presentation)
            .map(|c| targets.get(&c[1]).map(|t| resolve_target(t)))
            .collect();
        if let Some(ordered) = ordered {
            if !ordered.is_empty() && ordered.iter().all(|p| archive.by_name(p).is_ok()) {
                return Ok(ordered);
            }
        }
        debug!("Presentation slide list unusable, falling back to part names");
    }

    let mut numbered: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let caps = RE_SLIDE_PART.captures(name)?;
            let n = caps[1].parse().ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

fn relationship_targets(rels: &str) -> HashMap<String, String> {
    RE_RELATIONSHIP
        .find_iter(rels)
        .filter_map(|m| {
            let element = m.as_str();
            let id = RE_REL_ID.captures(element)?[1].to_string();
            let target = RE_REL_TARGET.captures(element)?[1].to_string();
            Some((id, target))
        })
        .collect()
}

/// Relationship targets in `presentation.xml.rels` are relative to `ppt/`.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

/// Text of each shape carrying a text body, paragraphs joined with newlines.
fn shape_texts(slide_xml: &str) -> Vec<String> {
    RE_SHAPE
        .find_iter(slide_xml)
        .filter_map(|shape| RE_TEXT_BODY.find(shape.as_str()))
        .map(|body| {
            RE_PARAGRAPH
                .find_iter(body.as_str())
                .map(|p| paragraph_runs(p.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect()
}

fn paragraph_runs(paragraph_xml: &str) -> String {
    let mut text = String::new();
    for caps in RE_RUN_TEXT.captures_iter(paragraph_xml) {
        match caps.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None if caps[0].starts_with("<a:br") => text.push('\n'),
            None => {}
        }
    }
    text
}

fn unescape_xml(raw: &str) -> String {
    RE_ENTITY
        .replace_all(raw, |caps: &regex::Captures| {
            let entity = &caps[1];
            match entity {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => {
                    let code = match entity.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity[1..].parse().ok(),
                    };
                    code.and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_else(|| caps[0].to_string())
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn slide(shapes: &[&str]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>"#,
            shapes.concat()
        )
    }

    fn text_shape(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:rPr lang=\"fr-FR\"/><a:t>{}</a:t></a:r></a:p>", p))
            .collect();
        format!("<p:sp><p:nvSpPr/><p:txBody><a:bodyPr/>{}</p:txBody></p:sp>", body)
    }

    fn write_pptx(path: &Path, parts: &[(&str, String)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_pptx_follows_presentation_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        write_pptx(
            &path,
            &[
                (
                    "ppt/presentation.xml",
                    r#"<p:presentation><p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst></p:presentation>"#.to_string(),
                ),
                (
                    "ppt/_rels/presentation.xml.rels",
                    r#"<Relationships><Relationship Id="rId2" Type="slide" Target="slides/slide1.xml"/><Relationship Target="slides/slide2.xml" Type="slide" Id="rId3"/></Relationships>"#.to_string(),
                ),
                ("ppt/slides/slide1.xml", slide(&[&text_shape(&["Second"])])),
                ("ppt/slides/slide2.xml", slide(&[&text_shape(&["First", "line two"])])),
            ],
        );

        let text = extract_text_from_pptx(&path).unwrap();
        assert_eq!(text, "First\nline two\n\nSecond\n\n");
    }

    #[test]
    fn test_pptx_falls_back_to_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        write_pptx(
            &path,
            &[
                ("ppt/slides/slide10.xml", slide(&[&text_shape(&["ten"])])),
                ("ppt/slides/slide2.xml", slide(&[&text_shape(&["two"])])),
                ("ppt/slides/_rels/slide2.xml.rels", "<Relationships/>".to_string()),
            ],
        );

        let text = extract_text_from_pptx(&path).unwrap();
        assert_eq!(text, "two\n\nten\n\n");
    }

    #[test]
    fn test_shapes_without_text_body_are_skipped() {
        let xml = slide(&[
            "<p:sp><p:nvSpPr/><p:spPr/></p:sp>",
            &text_shape(&["Titre &amp; r&#233;sum&#xE9;"]),
            "<p:pic><p:blipFill/></p:pic>",
        ]);
        assert_eq!(shape_texts(&xml), vec!["Titre & résumé".to_string()]);
    }

    #[test]
    fn test_line_breaks_and_empty_runs() {
        let xml = "<a:p><a:r><a:t>left</a:t></a:r><a:br/><a:r><a:t/></a:r><a:r><a:t>right</a:t></a:r></a:p>";
        assert_eq!(paragraph_runs(xml), "left\nright");
    }

    #[test]
    fn test_pptx_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pptx");
        fs::write(&path, b"plain text").unwrap();
        assert!(matches!(
            extract_text_from_pptx(&path),
            Err(ExtractError::Package(_))
        ));
    }

    #[test]
    fn test_docx_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"plain text").unwrap();
        assert!(matches!(extract_text_from_docx(&path), Err(ExtractError::Docx(_))));
    }

    fn run(text: &str) -> docx_rs::Run {
        docx_rs::Run::new().add_text(text)
    }

    fn pack_docx(path: &Path, docx: docx_rs::Docx) {
        docx.build().pack(File::create(path).unwrap()).unwrap();
    }

    #[test]
    fn test_docx_reads_paragraphs_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cours.docx");
        pack_docx(
            &path,
            docx_rs::Docx::new()
                .add_paragraph(docx_rs::Paragraph::new().add_run(run("Introduction")))
                .add_table(docx_rs::Table::new(vec![docx_rs::TableRow::new(vec![
                    docx_rs::TableCell::new().add_paragraph(docx_rs::Paragraph::new().add_run(run("cell"))),
                ])])),
        );

        let text = extract_text_from_docx(&path).unwrap();
        assert!(text.contains("Introduction"));
        assert!(text.contains("cell"));
    }

    #[test]
    fn test_docx_keeps_hyperlinks_insertions_and_content_controls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liens.docx");
        pack_docx(
            &path,
            docx_rs::Docx::new()
                .add_paragraph(
                    docx_rs::Paragraph::new()
                        .add_run(run("before "))
                        .add_hyperlink(
                            docx_rs::Hyperlink::new("https://example.org", docx_rs::HyperlinkType::External)
                                .add_run(run("LINKTEXT")),
                        )
                        .add_insert(docx_rs::Insert::new(run(" INSERTED"))),
                )
                .add_structured_data_tag(
                    docx_rs::StructuredDataTag::new()
                        .add_paragraph(docx_rs::Paragraph::new().add_run(run("CONTROLTEXT"))),
                ),
        );

        let text = extract_text_from_docx(&path).unwrap();
        assert!(text.contains("before LINKTEXT"), "hyperlink text missing: {:?}", text);
        assert!(text.contains("INSERTED"), "tracked insertion missing: {:?}", text);
        assert!(text.contains("CONTROLTEXT"), "content control missing: {:?}", text);
    }

    #[test]
    fn test_docx_headers_then_body_then_footers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examen.docx");
        pack_docx(
            &path,
            docx_rs::Docx::new()
                .header(docx_rs::Header::new().add_paragraph(docx_rs::Paragraph::new().add_run(run("HEADERTEXT"))))
                .footer(docx_rs::Footer::new().add_paragraph(docx_rs::Paragraph::new().add_run(run("FOOTERTEXT"))))
                .add_paragraph(docx_rs::Paragraph::new().add_run(run("BODYTEXT"))),
        );

        let text = extract_text_from_docx(&path).unwrap();
        let header = text.find("HEADERTEXT").expect("header text missing");
        let body = text.find("BODYTEXT").expect("body text missing");
        let footer = text.find("FOOTERTEXT").expect("footer text missing");
        assert!(header < body && body < footer, "wrong order: {:?}", text);
    }
}
