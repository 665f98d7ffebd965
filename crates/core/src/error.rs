use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("docx parse error: {0}")]
    DocxParse(String),

    #[error("json parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document analysis failed: {0}")]
    AnalysisFailed(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(String),

    #[error("transient collaborator failure: {0}")]
    Transient(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
