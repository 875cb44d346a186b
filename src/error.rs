use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ToolkitError {
    #[error("invalid study accession: {0}")]
    InvalidAccession(String),

    #[error("unsupported pipeline version: {0} (supported: 1.0, 2.0, 3.0, 4.0, 4.1)")]
    InvalidPipelineVersion(String),

    #[error("unsupported result group: {0}")]
    InvalidResultGroup(String),

    #[error("missing argument for {tool}: {argument}")]
    #[diagnostic(help("run `mg-toolkit --help` for usage"))]
    MissingArgument { tool: String, argument: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read sequence file {path}: {message}")]
    SequenceRead { path: PathBuf, message: String },

    #[error("sequence search request failed: {0}")]
    SearchHttp(String),

    #[error("sequence search returned status {status}: {message}")]
    SearchStatus { status: u16, message: String },

    #[error("metadata API request failed: {0}")]
    ApiHttp(String),

    #[error("metadata API returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("{collection}/{id} not found in metadata API")]
    ResourceNotFound { collection: String, id: String },

    #[error("ENA request failed: {0}")]
    EnaHttp(String),

    #[error("ENA returned status {status}: {message}")]
    EnaStatus { status: u16, message: String },

    #[error("malformed ENA sample record: {0}")]
    EnaParse(String),

    #[error("download failed: {0}")]
    DownloadHttp(String),

    #[error("download returned status {status}: {message}")]
    DownloadStatus { status: u16, message: String },

    #[error("failed to write CSV: {0}")]
    Csv(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl ToolkitError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ToolkitError::ResourceNotFound { .. })
    }
}

impl From<csv::Error> for ToolkitError {
    fn from(err: csv::Error) -> Self {
        ToolkitError::Csv(err.to_string())
    }
}
