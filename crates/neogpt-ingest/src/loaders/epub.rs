//! EPUB parser: spine-ordered chapters converted from XHTML.

use super::html::html_to_text;
use super::office::read_entry;
use super::{file_title, location_of, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

pub struct EpubParser;

impl EpubParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EpubParser {
    fn default() -> Self {
        Self::new()
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `full-path` of the first rootfile in `META-INF/container.xml`.
fn rootfile_path(xml: &[u8]) -> Result<String, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                return attr(&e, b"full-path").ok_or_else(|| "rootfile without full-path".to_string());
            }
            Ok(Event::Eof) => return Err("container.xml has no rootfile".to_string()),
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
}

#[derive(Debug, Default)]
struct Package {
    title: Option<String>,
    manifest: HashMap<String, String>,
    spine: Vec<String>,
}

fn read_package(xml: &[u8]) -> Result<Package, String> {
    let mut package = Package::default();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_title = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"title" if package.title.is_none() => in_title = true,
                b"item" => {
                    if let (Some(id), Some(href)) = (attr(&e, b"id"), attr(&e, b"href")) {
                        package.manifest.insert(id, href);
                    }
                }
                b"itemref" => {
                    if let Some(idref) = attr(&e, b"idref") {
                        package.spine.push(idref);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(te)) if in_title => {
                let title = te.unescape().map_err(|e| e.to_string())?;
                package.title = Some(title.into_owned());
                in_title = false;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"title" => in_title = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(package)
}

/// Resolve a manifest href against the package document's directory.
fn resolve_href(package_path: &str, href: &str) -> String {
    let href = href.replace("%20", " ");
    let mut parts: Vec<&str> = match package_path.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in href.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn extract_book<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<(String, Option<String>), String> {
    let container = read_entry(archive, "META-INF/container.xml")?;
    let package_path = rootfile_path(&container)?;
    let package = read_package(&read_entry(archive, &package_path)?)?;

    let mut chapters = Vec::new();
    for idref in &package.spine {
        let Some(href) = package.manifest.get(idref) else {
            continue;
        };
        let entry = resolve_href(&package_path, href);
        let bytes = read_entry(archive, &entry)?;
        let (text, _) = html_to_text(&String::from_utf8_lossy(&bytes));
        if !text.is_empty() {
            chapters.push(text);
        }
    }
    Ok((chapters.join("\n\n"), package.title))
}

impl DocumentParser for EpubParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }
        let location = location_of(path);
        let file = std::fs::File::open(path)?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| IngestError::parse(&location, e))?;
        let (content, title) =
            extract_book(&mut archive).map_err(|e| IngestError::parse(&location, e))?;

        let mut doc = ParsedDocument::new(content)
            .with_metadata(serde_json::json!({ "format": "epub" }));
        if let Some(t) = title.or_else(|| file_title(path)) {
            doc = doc.with_title(t);
        }
        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &["epub"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_book(path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let entries = [
            (
                "META-INF/container.xml",
                r#"<container><rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles></container>"#,
            ),
            (
                "OEBPS/content.opf",
                r#"<package><metadata><dc:title xmlns:dc="dc">A Short Book</dc:title></metadata>
                   <manifest>
                     <item id="c1" href="text/one.xhtml" media-type="application/xhtml+xml"/>
                     <item id="c2" href="text/two.xhtml" media-type="application/xhtml+xml"/>
                   </manifest>
                   <spine><itemref idref="c2"/><itemref idref="c1"/></spine></package>"#,
            ),
            ("OEBPS/text/one.xhtml", "<html><body><p>Chapter one.</p></body></html>"),
            ("OEBPS/text/two.xhtml", "<html><body><p>Chapter two.</p></body></html>"),
        ];
        for (name, body) in entries {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_spine_order_and_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        write_book(&path);

        let docs = EpubParser::new().parse(&path).unwrap();

        assert_eq!(docs[0].title.as_deref(), Some("A Short Book"));
        assert_eq!(docs[0].content, "Chapter two.\n\nChapter one.");
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href("OEBPS/content.opf", "text/a.xhtml"), "OEBPS/text/a.xhtml");
        assert_eq!(resolve_href("OEBPS/x/content.opf", "../a.xhtml"), "OEBPS/a.xhtml");
        assert_eq!(resolve_href("content.opf", "a%20b.xhtml"), "a b.xhtml");
    }
}
