use serde::{Deserialize, Serialize};

/// The document formats the ingestion pipeline understands. Each format
/// maps to a fixed set of file-extension aliases; aliases are unique
/// across all formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Html,
    Markdown,
    Json,
    Text,
    Docx,
}

/// Registration order; format-to-format chunk ordering follows this.
pub const REGISTERED_FORMATS: [DocumentFormat; 6] = [
    DocumentFormat::Pdf,
    DocumentFormat::Html,
    DocumentFormat::Markdown,
    DocumentFormat::Json,
    DocumentFormat::Text,
    DocumentFormat::Docx,
];

impl DocumentFormat {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Html => "html",
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Json => "json",
            DocumentFormat::Text => "text",
            DocumentFormat::Docx => "docx",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            DocumentFormat::Pdf => &["pdf", "pdfa", "pdfa-1", "pdfl"],
            DocumentFormat::Html => &["html", "htm", "xhtml", "html5"],
            DocumentFormat::Markdown => &["md", "markdown"],
            DocumentFormat::Json => &["json"],
            DocumentFormat::Text => &["txt", "rtf"],
            DocumentFormat::Docx => &["docx"],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        REGISTERED_FORMATS
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentFormat, REGISTERED_FORMATS};
    use std::collections::HashSet;

    #[test]
    fn aliases_are_globally_unique() {
        let mut seen = HashSet::new();
        for format in REGISTERED_FORMATS {
            for alias in format.aliases() {
                assert!(seen.insert(*alias), "duplicate alias: {alias}");
            }
        }
    }

    #[test]
    fn every_format_resolves_by_name() {
        for format in REGISTERED_FORMATS {
            assert_eq!(DocumentFormat::from_name(format.name()), Some(format));
        }
        assert_eq!(DocumentFormat::from_name("MARKDOWN"), Some(DocumentFormat::Markdown));
        assert_eq!(DocumentFormat::from_name("parquet"), None);
    }
}
