use crate::error::IngestError;
use crate::formats::DocumentFormat;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Opaque credential bundle for the layout-analysis service. The
/// ingestion pipeline passes it through without inspecting it.
#[derive(Debug, Clone)]
pub struct AnalysisCredentials {
    pub endpoint: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct AnalyzeRequest {
    content_base64: String,
    source_path: String,
    format: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AnalyzeResponse {
    sections: Option<Vec<AnalyzedSection>>,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnalyzedSection {
    #[serde(default)]
    text: Option<String>,
}

/// Sends the file to the layout-analysis service and returns its
/// structural sections (tables, headings, paragraphs) as plain text, in
/// document order.
pub fn analyze_layout(
    credentials: &AnalysisCredentials,
    path: &Path,
    format: DocumentFormat,
) -> Result<Vec<String>, IngestError> {
    tokio::task::block_in_place(|| analyze_layout_blocking(credentials, path, format))
}

fn analyze_layout_blocking(
    credentials: &AnalysisCredentials,
    path: &Path,
    format: DocumentFormat,
) -> Result<Vec<String>, IngestError> {
    let bytes = std::fs::read(path)?;
    let payload = AnalyzeRequest {
        content_base64: STANDARD.encode(bytes),
        source_path: path.to_string_lossy().to_string(),
        format: format.name().to_string(),
    };

    let mut request = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?
        .post(&credentials.endpoint)
        .header("content-type", "application/json")
        .json(&payload);

    if let Some(api_key) = &credentials.api_key {
        request = request.bearer_auth(api_key);
    }

    let response = request.send()?;

    if !response.status().is_success() {
        return Err(IngestError::AnalysisFailed(format!(
            "layout request to {} returned {}",
            credentials.endpoint,
            response.status()
        )));
    }

    let payload: AnalyzeResponse = response.json()?;
    payload_to_sections(&payload, path)
}

fn payload_to_sections(payload: &AnalyzeResponse, path: &Path) -> Result<Vec<String>, IngestError> {
    if let Some(listed) = &payload.sections {
        let sections = listed
            .iter()
            .filter_map(|section| {
                let text = section.text.as_ref().map(|value| value.trim().to_string());
                text.filter(|normalized| !normalized.is_empty())
            })
            .collect::<Vec<_>>();

        if !sections.is_empty() {
            return Ok(sections);
        }
    }

    if let Some(raw_text) = &payload.text {
        let sections = raw_text
            .split("\n\n")
            .filter_map(|block| {
                let normalized = block.trim().to_string();
                if normalized.is_empty() {
                    None
                } else {
                    Some(normalized)
                }
            })
            .collect::<Vec<_>>();

        if !sections.is_empty() {
            return Ok(sections);
        }
    }

    Err(IngestError::AnalysisFailed(format!(
        "layout response was empty for {}",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::{payload_to_sections, AnalyzeResponse, AnalyzedSection};
    use std::path::Path;

    #[test]
    fn section_list_keeps_only_nonempty_text() {
        let response = AnalyzeResponse {
            sections: Some(vec![
                AnalyzedSection {
                    text: Some("  ".to_string()),
                },
                AnalyzedSection {
                    text: Some("Heading 3".to_string()),
                },
            ]),
            text: None,
        };

        let sections = payload_to_sections(&response, Path::new("x.docx"))
            .expect("layout response should be parsed");

        assert_eq!(sections, vec!["Heading 3".to_string()]);
    }

    #[test]
    fn fallback_text_splits_on_blank_lines() {
        let response = AnalyzeResponse {
            sections: None,
            text: Some("First block\n\nSecond block\n".to_string()),
        };

        let sections = payload_to_sections(&response, Path::new("x.pdf"))
            .expect("layout response should be parsed");

        assert_eq!(sections, vec!["First block".to_string(), "Second block".to_string()]);
    }

    #[test]
    fn empty_payload_is_an_error() {
        let response = AnalyzeResponse {
            sections: None,
            text: None,
        };
        assert!(payload_to_sections(&response, Path::new("x.pdf")).is_err());
    }
}
