// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop an eigenface run.
///
/// Input errors come from the loader, configuration errors from `PipelineConfig`
/// or an out-of-range component count, and numerical errors from the PCA engine.
/// None of them are retryable: every step is deterministic.
#[derive(Debug, Error)]
pub enum EigenfaceError {
    #[error("no eligible image files (png, jpg, jpeg) found in '{}'", .directory.display())]
    NoImagesFound { directory: PathBuf },

    #[error("failed to decode image '{}': {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image '{}': {source}", .path.display())]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("data matrix needs at least one image")]
    EmptyDataset,

    #[error("image {index} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("component count {requested} outside valid range [1, {max}]")]
    InvalidComponentCount { requested: usize, max: usize },

    #[error("dataset has effective rank {rank}, fewer than the {requested} requested components")]
    DegenerateVariance { rank: usize, requested: usize },

    #[error("matrix decomposition failed: {0}")]
    Decomposition(String),

    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EigenfaceError>;
