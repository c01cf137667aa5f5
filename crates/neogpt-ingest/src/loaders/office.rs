//! Office Open XML parsers (docx, pptx, xlsx).
//!
//! Legacy binary formats (`.doc`, `.ppt`, `.xls`) classify to the same
//! loaders but have no parser; the registry reports them as missing adapters.

use super::{file_title, location_of, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use quick_xml::events::Event;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Decompressed size cap for one archive entry.
pub(super) const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
const MAX_SHEETS: usize = 100;
const MAX_CELLS_PER_SHEET: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeFormat {
    Docx,
    Pptx,
    Xlsx,
}

impl OfficeFormat {
    fn extension(&self) -> &'static str {
        match self {
            OfficeFormat::Docx => "docx",
            OfficeFormat::Pptx => "pptx",
            OfficeFormat::Xlsx => "xlsx",
        }
    }
}

pub struct OfficeParser {
    format: OfficeFormat,
    extensions: [&'static str; 1],
}

impl OfficeParser {
    pub fn new(format: OfficeFormat) -> Self {
        Self {
            format,
            extensions: [format.extension()],
        }
    }

    pub fn format(&self) -> OfficeFormat {
        self.format
    }

    /// Extract text from an in-memory archive.
    pub fn extract(&self, bytes: Vec<u8>) -> Result<String, String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
        match self.format {
            OfficeFormat::Docx => {
                let xml = read_entry(&mut archive, "word/document.xml")?;
                collect_text(&xml)
            }
            OfficeFormat::Pptx => extract_slides(&mut archive),
            OfficeFormat::Xlsx => extract_sheets(&mut archive),
        }
    }
}

impl DocumentParser for OfficeParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let content = self
            .extract(bytes)
            .map_err(|e| IngestError::parse(location_of(path), e))?;

        let mut doc = ParsedDocument::new(content).with_metadata(serde_json::json!({
            "format": self.format.extension(),
        }));
        if let Some(t) = file_title(path) {
            doc = doc.with_title(t);
        }
        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &self.extensions
    }
}

/// Read one archive entry, refusing anything over [`MAX_ENTRY_BYTES`].
pub(super) fn read_entry<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, String> {
    let entry = archive.by_name(name).map_err(|e| format!("{}: {}", name, e))?;
    let mut out = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    if out.len() as u64 >= MAX_ENTRY_BYTES {
        return Err(format!("{} exceeds size limit ({} bytes)", name, MAX_ENTRY_BYTES));
    }
    Ok(out)
}

/// Text runs (`<w:t>`, `<a:t>`) with a line break after every paragraph.
fn collect_text(xml: &[u8]) -> Result<String, String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| e.to_string())?;
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push(' ');
                }
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if !out.is_empty() && !out.ends_with('\n') => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

/// Numbered entries such as `ppt/slides/slide3.xml`, in numeric order.
fn numbered_entries<R: Read + Seek>(
    archive: &zip::ZipArchive<R>,
    prefix: &str,
) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_slides<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<String, String> {
    let mut slides = Vec::new();
    for name in numbered_entries(archive, "ppt/slides/slide") {
        let xml = read_entry(archive, &name)?;
        let text = collect_text(&xml)?;
        if !text.is_empty() {
            slides.push(text);
        }
    }
    Ok(slides.join("\n\n"))
}

fn extract_sheets<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<String, String> {
    let has_shared = archive.file_names().any(|n| n == "xl/sharedStrings.xml");
    let shared = if has_shared {
        read_shared_strings(&read_entry(archive, "xl/sharedStrings.xml")?)?
    } else {
        Vec::new()
    };

    let mut sheets = Vec::new();
    for name in numbered_entries(archive, "xl/worksheets/sheet")
        .into_iter()
        .take(MAX_SHEETS)
    {
        let xml = read_entry(archive, &name)?;
        let rows = sheet_rows(&xml, &shared)?;
        if !rows.is_empty() {
            sheets.push(rows);
        }
    }
    Ok(sheets.join("\n\n"))
}

fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>, String> {
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().map_err(|e| e.to_string())?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => {
                    if let Some(s) = current.take() {
                        strings.push(s);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// One line per row, cells separated by tabs. Shared-string cells are
/// resolved; inline and numeric values are taken as written.
fn sheet_rows(xml: &[u8], shared: &[String]) -> Result<String, String> {
    let mut rows: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_value = false;
    let mut shared_cell = false;
    let mut cells = 0usize;

    loop {
        if cells >= MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    shared_cell = e.attributes().any(|a| {
                        a.map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                let raw = te.unescape().map_err(|e| e.to_string())?;
                let value = raw.trim();
                let resolved = if shared_cell {
                    value
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared.get(i).cloned())
                } else if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
                if let Some(v) = resolved {
                    row.push(v);
                    cells += 1;
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => shared_cell = false,
                b"row" => {
                    if !row.is_empty() {
                        rows.push(row.join("\t"));
                        row.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    if !row.is_empty() {
        rows.push(row.join("\t"));
    }
    Ok(rows.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_docx_paragraphs() {
        let bytes = archive(&[(
            "word/document.xml",
            r#"<w:document xmlns:w="w"><w:body>
                <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>
                <w:p><w:r><w:t>Second &amp; last</w:t></w:r></w:p>
            </w:body></w:document>"#,
        )]);

        let text = OfficeParser::new(OfficeFormat::Docx).extract(bytes).unwrap();
        assert_eq!(text, "Hello world\nSecond & last");
    }

    #[test]
    fn test_pptx_slide_order() {
        let slide = |t: &str| format!(r#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:t>{}</a:t></a:p></p:sld>"#, t);
        let ten = slide("ten");
        let two = slide("two");
        let bytes = archive(&[
            ("ppt/slides/slide10.xml", ten.as_str()),
            ("ppt/slides/slide2.xml", two.as_str()),
        ]);

        let text = OfficeParser::new(OfficeFormat::Pptx).extract(bytes).unwrap();
        assert_eq!(text, "two\n\nten");
    }

    #[test]
    fn test_xlsx_shared_strings() {
        let bytes = archive(&[
            (
                "xl/sharedStrings.xml",
                r#"<sst><si><t>name</t></si><si><t>Ada</t></si></sst>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData>
                    <row><c t="s"><v>0</v></c><c><v>42</v></c></row>
                    <row><c t="s"><v>1</v></c></row>
                </sheetData></worksheet>"#,
            ),
        ]);

        let text = OfficeParser::new(OfficeFormat::Xlsx).extract(bytes).unwrap();
        assert_eq!(text, "name\t42\nAda");
    }

    #[test]
    fn test_not_a_zip() {
        let mut file = tempfile::NamedTempFile::with_suffix(".docx").unwrap();
        file.write_all(b"plain bytes").unwrap();

        let result = OfficeParser::new(OfficeFormat::Docx).parse(file.path());
        assert!(matches!(result, Err(IngestError::Parse { .. })));
    }
}
