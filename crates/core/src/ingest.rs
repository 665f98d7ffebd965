use crate::analysis::{analyze_layout, AnalysisCredentials};
use crate::chunking::{normalize_whitespace, split_fixed_windows, ChunkingConfig};
use crate::error::IngestError;
use crate::extract::extract_text;
use crate::formats::{DocumentFormat, REGISTERED_FORMATS};
use crate::models::{Chunk, ChunkingStrategy};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Which registered formats an ingestion run should consider.
#[derive(Debug, Clone)]
pub enum AllowedFormats {
    All,
    Named(Vec<String>),
}

pub fn discover_files(folder: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(ext))
            });

        if matches {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn load_pdf_files(
    strategy: ChunkingStrategy,
    credentials: &AnalysisCredentials,
    folder_path: &Path,
    config: ChunkingConfig,
    glob_patterns: &[&str],
) -> Result<Vec<Chunk>, IngestError> {
    load_format_files(DocumentFormat::Pdf, strategy, credentials, folder_path, config, glob_patterns)
}

pub fn load_html_files(
    strategy: ChunkingStrategy,
    credentials: &AnalysisCredentials,
    folder_path: &Path,
    config: ChunkingConfig,
    glob_patterns: &[&str],
) -> Result<Vec<Chunk>, IngestError> {
    load_format_files(DocumentFormat::Html, strategy, credentials, folder_path, config, glob_patterns)
}

pub fn load_markdown_files(
    strategy: ChunkingStrategy,
    credentials: &AnalysisCredentials,
    folder_path: &Path,
    config: ChunkingConfig,
    glob_patterns: &[&str],
) -> Result<Vec<Chunk>, IngestError> {
    load_format_files(DocumentFormat::Markdown, strategy, credentials, folder_path, config, glob_patterns)
}

pub fn load_json_files(
    strategy: ChunkingStrategy,
    credentials: &AnalysisCredentials,
    folder_path: &Path,
    config: ChunkingConfig,
    glob_patterns: &[&str],
) -> Result<Vec<Chunk>, IngestError> {
    load_format_files(DocumentFormat::Json, strategy, credentials, folder_path, config, glob_patterns)
}

pub fn load_text_files(
    strategy: ChunkingStrategy,
    credentials: &AnalysisCredentials,
    folder_path: &Path,
    config: ChunkingConfig,
    glob_patterns: &[&str],
) -> Result<Vec<Chunk>, IngestError> {
    load_format_files(DocumentFormat::Text, strategy, credentials, folder_path, config, glob_patterns)
}

pub fn load_docx_files(
    strategy: ChunkingStrategy,
    credentials: &AnalysisCredentials,
    folder_path: &Path,
    config: ChunkingConfig,
    glob_patterns: &[&str],
) -> Result<Vec<Chunk>, IngestError> {
    load_format_files(DocumentFormat::Docx, strategy, credentials, folder_path, config, glob_patterns)
}

/// The loader shape every format conforms to: enumerate matching files,
/// extract raw text (or ask the layout service for sections), window the
/// text, and emit uniform chunk records in document order.
pub fn load_format_files(
    format: DocumentFormat,
    strategy: ChunkingStrategy,
    credentials: &AnalysisCredentials,
    folder_path: &Path,
    config: ChunkingConfig,
    glob_patterns: &[&str],
) -> Result<Vec<Chunk>, IngestError> {
    debug!(format = format.name(), "loading files");

    let files = discover_files(folder_path, glob_patterns);
    let mut chunks = Vec::new();

    for path in files {
        let title = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.to_string())
            .ok_or_else(|| {
                IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
            })?;

        let windows = match strategy {
            ChunkingStrategy::Basic => {
                let raw = extract_text(format, &path)?;
                split_fixed_windows(&normalize_whitespace(&raw), config)?
            }
            ChunkingStrategy::DocumentIntelligence => {
                let sections = analyze_layout(credentials, &path, format)?;
                let mut all = Vec::new();
                for section in sections {
                    all.extend(split_fixed_windows(&normalize_whitespace(&section), config)?);
                }
                all
            }
        };

        for (index, content) in windows.into_iter().enumerate() {
            if content.trim().is_empty() {
                continue;
            }

            let mut metadata = BTreeMap::new();
            metadata.insert("format".to_string(), json!(format.name()));
            metadata.insert("title".to_string(), json!(title));
            metadata.insert("chunk_index".to_string(), json!(index));

            chunks.push(Chunk {
                chunk_id: make_chunk_id(&path, index, &content),
                content,
                source_path: path.to_string_lossy().to_string(),
                metadata,
            });
        }
    }

    Ok(chunks)
}

/// Loads every requested format from `folder_path` into one flat chunk
/// sequence. Unregistered format names are logged and skipped; a loader
/// failure propagates unmodified.
pub fn load_documents(
    strategy: ChunkingStrategy,
    credentials: &AnalysisCredentials,
    allowed_formats: &AllowedFormats,
    folder_path: &Path,
    chunk_size: usize,
    overlap_size: usize,
) -> Result<Vec<Chunk>, IngestError> {
    let config = ChunkingConfig {
        chunk_size,
        overlap_size,
    };
    config.validate()?;

    if !folder_path.exists() {
        return Err(IngestError::FolderNotFound(
            folder_path.to_string_lossy().to_string(),
        ));
    }

    let requested: Vec<String> = match allowed_formats {
        AllowedFormats::All => REGISTERED_FORMATS
            .iter()
            .map(|format| format.name().to_string())
            .collect(),
        AllowedFormats::Named(names) => names.clone(),
    };

    debug!(
        folder = %folder_path.display(),
        formats = requested.join(","),
        "loading documents"
    );

    let mut all_chunks = Vec::new();
    for name in requested {
        let Some(format) = DocumentFormat::from_name(&name) else {
            warn!(format = %name, "requested format is not registered, skipping");
            continue;
        };

        let loaded = load_format_files(
            format,
            strategy,
            credentials,
            folder_path,
            config,
            format.aliases(),
        )?;
        all_chunks.extend(loaded);
    }

    info!(
        folder = %folder_path.display(),
        chunk_count = all_chunks.len(),
        "loaded chunks"
    );

    Ok(all_chunks)
}

fn make_chunk_id(path: &Path, index: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn no_credentials() -> AnalysisCredentials {
        AnalysisCredentials {
            endpoint: "http://localhost:0/analyze".to_string(),
            api_key: None,
        }
    }

    fn write_corpus(base: &Path) {
        fs::write(base.join("notes.txt"), "plain text corpus body for chunking").unwrap();
        fs::write(base.join("guide.md"), "# Guide\n\nmarkdown corpus body here").unwrap();
        fs::write(
            base.join("page.html"),
            "<html><body><p>html corpus body inside tags</p></body></html>",
        )
        .unwrap();
        fs::write(base.join("data.json"), r#"{"entry": "json corpus body value"}"#).unwrap();
    }

    #[test]
    fn discovery_is_recursive_and_extension_filtered() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(nested.join("b.TXT"), "beta").unwrap();
        fs::write(nested.join("c.json"), "{}").unwrap();

        let files = discover_files(dir.path(), &["txt"]);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn missing_folder_is_fatal() {
        let result = load_documents(
            ChunkingStrategy::Basic,
            &no_credentials(),
            &AllowedFormats::All,
            Path::new("/definitely/not/here"),
            128,
            16,
        );
        assert!(matches!(result, Err(IngestError::FolderNotFound(_))));
    }

    #[test]
    fn invalid_chunk_config_fails_before_touching_files() {
        // a bad geometry beats even a missing folder
        let result = load_documents(
            ChunkingStrategy::Basic,
            &no_credentials(),
            &AllowedFormats::All,
            Path::new("/definitely/not/here"),
            16,
            16,
        );
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[test]
    fn all_formats_equal_the_sum_of_individual_loads() {
        let dir = tempdir().unwrap();
        write_corpus(dir.path());
        let config = ChunkingConfig {
            chunk_size: 16,
            overlap_size: 4,
        };

        let combined = load_documents(
            ChunkingStrategy::Basic,
            &no_credentials(),
            &AllowedFormats::All,
            dir.path(),
            config.chunk_size,
            config.overlap_size,
        )
        .unwrap();

        let mut individual = 0;
        for format in REGISTERED_FORMATS {
            individual += load_format_files(
                format,
                ChunkingStrategy::Basic,
                &no_credentials(),
                dir.path(),
                config,
                format.aliases(),
            )
            .unwrap()
            .len();
        }

        assert!(!combined.is_empty());
        assert_eq!(combined.len(), individual);
    }

    #[test]
    fn unregistered_formats_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        write_corpus(dir.path());

        let chunks = load_documents(
            ChunkingStrategy::Basic,
            &no_credentials(),
            &AllowedFormats::Named(vec!["parquet".to_string(), "text".to_string()]),
            dir.path(),
            16,
            4,
        )
        .unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks
            .iter()
            .all(|chunk| chunk.metadata["format"] == "text"));
    }

    #[test]
    fn empty_file_yields_zero_chunks() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();

        let chunks = load_documents(
            ChunkingStrategy::Basic,
            &no_credentials(),
            &AllowedFormats::Named(vec!["text".to_string()]),
            dir.path(),
            16,
            4,
        )
        .unwrap();

        assert!(chunks.is_empty());
    }

    #[test]
    fn chunk_ids_are_reproducible() {
        let first = make_chunk_id(Path::new("/tmp/a.txt"), 0, "content");
        let second = make_chunk_id(Path::new("/tmp/a.txt"), 0, "content");
        assert_eq!(first, second);
    }
}
