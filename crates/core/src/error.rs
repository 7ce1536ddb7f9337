//! Error types for stripflood

use thiserror::Error;

/// Main error type for stripflood operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("No data value not set")]
    NoDataNotSet,

    #[error("No geotransform present")]
    MissingGeotransform,

    #[error("Label space exhausted: {0}")]
    LabelOverflow(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Worker {index} failed: {message}")]
    Worker { index: usize, message: String },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for stripflood operations
pub type Result<T> = std::result::Result<T, Error>;
