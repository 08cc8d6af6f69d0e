use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions for a batch run. Rejected and duplicate rows are not errors;
/// they only show up in the run counters.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input unreadable: {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download input from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Internet data source selected but no input_url configured")]
    MissingInputUrl,

    #[error("Failed to write {path}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Output directory must name a directory: {0}")]
    InvalidOutputDirectory(PathBuf),

    #[error("Writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
