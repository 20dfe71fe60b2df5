use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Hash mismatch! Expected {expected} but got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("batch_id={batch_id} frame_range={first_frame}-{last_frame} parse failed")]
    Batch {
        batch_id: usize,
        first_frame: usize,
        last_frame: usize,
        #[source]
        source: Box<HubError>,
    },

    #[error("missing parallel batch result: {0}")]
    MissingBatch(usize),

    #[error("journal error: {0}")]
    Journal(String),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("download error: {0}")]
    Download(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("worker pool error: {0}")]
    Pool(String),
}

impl From<rayon::ThreadPoolBuildError> for HubError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        HubError::Pool(e.to_string())
    }
}

impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        HubError::Download(e.to_string())
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, HubError>;
