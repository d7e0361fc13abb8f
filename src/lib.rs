// Eigenfaces: principal component analysis of grayscale face images

#![doc = include_str!("../README.md")]

pub mod config;
pub mod data_matrix;
pub mod error;
pub mod linalg_backends;
pub mod loader;
pub mod pca;
pub mod pipeline;
pub mod reporter;

pub use config::PipelineConfig;
pub use data_matrix::{build_data_matrix, flatten, DataMatrix};
pub use error::{EigenfaceError, Result};
pub use pca::{center, reconstruction_error, reshape_to_image, to_intensity_grid, Eigenfaces};
pub use pipeline::{fit_and_reconstruct, run_pipeline, PipelineSummary, Reconstruction};
