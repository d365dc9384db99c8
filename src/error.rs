use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::models::naming::DateOffsets;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(
        "Directory {} has {depth} path components, expected at least {minimum}",
        .path.display()
    )]
    InvalidPathDepth {
        path: PathBuf,
        depth: usize,
        minimum: usize,
    },

    #[error("Cannot open raster {}: {reason}", .path.display())]
    RasterOpen { path: PathBuf, reason: String },

    #[error("Cannot open zone source {}: {reason}", .path.display())]
    VectorOpen { path: PathBuf, reason: String },

    #[error("Cannot parse a {expected} date from '{file}' at offsets {offsets}: got '{token}'")]
    DateParse {
        file: String,
        token: String,
        expected: &'static str,
        offsets: DateOffsets,
    },

    #[error("Zone source {} has a bad or missing '{field}' attribute: {detail}", .path.display())]
    Schema {
        path: PathBuf,
        field: String,
        detail: String,
    },

    #[error("Image {} (class '{class_label}', offsets {offsets}) failed: {source}", .image.display())]
    ImageFailed {
        image: PathBuf,
        class_label: String,
        offsets: DateOffsets,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Image {} exceeded the {timeout:?} timeout", .image.display())]
    ImageTimeout { image: PathBuf, timeout: Duration },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
