use crate::error::IngestError;
use crate::formats::DocumentFormat;
use lopdf::Document;
use regex::Regex;
use std::io::Read;
use std::path::Path;

/// Maximum decompressed bytes read from a DOCX archive entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extracts raw text for one file of the given format. The only
/// behavioral divergence between format loaders lives here.
pub fn extract_text(format: DocumentFormat, path: &Path) -> Result<String, IngestError> {
    match format {
        DocumentFormat::Pdf => extract_pdf(path),
        DocumentFormat::Html => extract_html(path),
        DocumentFormat::Markdown => extract_markdown(path),
        DocumentFormat::Json => extract_json(path),
        DocumentFormat::Text => Ok(std::fs::read_to_string(path)?),
        DocumentFormat::Docx => extract_docx(path),
    }
}

fn extract_pdf(path: &Path) -> Result<String, IngestError> {
    let document = Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    Ok(pages.join("\n\n"))
}

fn extract_html(path: &Path) -> Result<String, IngestError> {
    let raw = std::fs::read_to_string(path)?;
    strip_html(&raw)
}

pub(crate) fn strip_html(raw: &str) -> Result<String, IngestError> {
    let invisible = Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>")?;
    let tags = Regex::new(r"(?s)<[^>]*>")?;

    let without_blocks = invisible.replace_all(raw, " ");
    let without_tags = tags.replace_all(&without_blocks, " ");
    Ok(decode_entities(&without_tags))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn extract_markdown(path: &Path) -> Result<String, IngestError> {
    let raw = std::fs::read_to_string(path)?;
    strip_markdown(&raw)
}

pub(crate) fn strip_markdown(raw: &str) -> Result<String, IngestError> {
    let fences = Regex::new(r"(?m)^```.*$")?;
    let headings = Regex::new(r"(?m)^#{1,6}\s+")?;
    let links = Regex::new(r"\[([^\]]*)\]\([^)]*\)")?;
    let emphasis = Regex::new(r"[*_]{1,3}([^*_]+)[*_]{1,3}")?;

    let text = fences.replace_all(raw, "");
    let text = headings.replace_all(&text, "");
    let text = links.replace_all(&text, "$1");
    let text = emphasis.replace_all(&text, "$1");
    Ok(text.replace('`', ""))
}

fn extract_json(path: &Path) -> Result<String, IngestError> {
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(String::new());
    }
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let mut texts = Vec::new();
    collect_json_strings(&value, &mut texts);
    Ok(texts.join("\n"))
}

fn collect_json_strings(value: &serde_json::Value, texts: &mut Vec<String>) {
    match value {
        serde_json::Value::String(text) => {
            if !text.trim().is_empty() {
                texts.push(text.clone());
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_strings(item, texts);
            }
        }
        serde_json::Value::Object(fields) => {
            for field in fields.values() {
                collect_json_strings(field, texts);
            }
        }
        _ => {}
    }
}

fn extract_docx(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|error| IngestError::DocxParse(error.to_string()))?;

    let mut document_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|error| IngestError::DocxParse(error.to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut document_xml)
            .map_err(|error| IngestError::DocxParse(error.to_string()))?;
    }
    if document_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(IngestError::DocxParse(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    collect_docx_runs(&document_xml)
}

/// Walks `word/document.xml` collecting `w:t` text runs; paragraph ends
/// become newlines.
fn collect_docx_runs(xml: &[u8]) -> Result<String, IngestError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(element)) => {
                if element.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(text)) if in_text_run => {
                out.push_str(text.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(element)) => {
                match element.local_name().as_ref() {
                    b"t" => in_text_run = false,
                    b"p" => out.push('\n'),
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(error) => return Err(IngestError::DocxParse(error.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_tags_and_hidden_blocks_are_stripped() {
        let raw = "<html><head><style>p { color: red; }</style></head>\
                   <body><p>Hello &amp; welcome</p><script>var x = 1;</script></body></html>";
        let text = strip_html(raw).unwrap();
        assert!(text.contains("Hello & welcome"));
        assert!(!text.contains("color"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn markdown_syntax_is_stripped() {
        let raw = "# Title\n\nSome **bold** text with a [link](https://example.com) and `code`.\n";
        let text = strip_markdown(raw).unwrap();
        assert!(text.contains("Title"));
        assert!(text.contains("bold"));
        assert!(text.contains("link"));
        assert!(!text.contains("**"));
        assert!(!text.contains("example.com"));
    }

    #[test]
    fn json_string_values_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(
            &path,
            r#"{"title": "Report", "sections": [{"body": "First"}, {"body": "Second"}], "pages": 3}"#,
        )
        .unwrap();

        let text = extract_json(&path).unwrap();
        assert!(text.contains("Report"));
        assert!(text.contains("First"));
        assert!(text.contains("Second"));
        assert!(!text.contains('3'));
    }

    #[test]
    fn invalid_docx_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let result = extract_docx(&path);
        assert!(matches!(result, Err(IngestError::DocxParse(_))));
    }

    #[test]
    fn docx_runs_collapse_to_paragraph_text() {
        let xml = br#"<w:document xmlns:w="ns"><w:body>
            <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = collect_docx_runs(xml).unwrap();
        assert!(text.contains("First paragraph\n"));
        assert!(text.contains("Second paragraph"));
    }
}
