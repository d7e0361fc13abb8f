// src/pipeline.rs

use crate::config::PipelineConfig;
use crate::data_matrix::{build_data_matrix, DataMatrix};
use crate::error::Result;
use crate::linalg_backends::BackendSVD;
use crate::loader::ImageLoader;
use crate::pca::{reconstruction_error, reshape_to_image, Eigenfaces};
use crate::reporter::Reporter;
use log::info;
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Fitted model together with every sample's coefficients and reconstruction.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub model: Eigenfaces,
    /// Shape: (n, k)
    pub coefficients: Array2<f64>,
    /// Shape: (n, d)
    pub reconstructed: Array2<f64>,
    pub height: usize,
    pub width: usize,
}

impl Reconstruction {
    /// Reconstructed rows reshaped back to `(height, width)` images, index-aligned
    /// with the input.
    pub fn images(&self) -> Result<Vec<Array2<f64>>> {
        self.reconstructed
            .rows()
            .into_iter()
            .map(|row| reshape_to_image(row, self.height, self.width))
            .collect()
    }

    pub fn mean_face(&self) -> Result<Array2<f64>> {
        reshape_to_image(self.model.mean().view(), self.height, self.width)
    }
}

/// Fits `n_components` eigenfaces to `data` and runs every sample through
/// project and reconstruct.
pub fn fit_and_reconstruct<B: BackendSVD + ?Sized>(
    backend: &B,
    data: &DataMatrix,
    n_components: usize,
    strict_degeneracy: bool,
) -> Result<Reconstruction> {
    let model = Eigenfaces::fit_with(backend, data.view(), n_components, strict_degeneracy)?;
    let coefficients = model.project(data.view())?;
    let reconstructed = model.reconstruct(coefficients.view())?;
    Ok(Reconstruction {
        model,
        coefficients,
        reconstructed,
        height: data.height(),
        width: data.width(),
    })
}

/// What a run produced, also written as `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub n_samples: usize,
    pub height: usize,
    pub width: usize,
    pub n_components: usize,
    pub effective_rank: usize,
    pub explained_variance_ratio: Array1<f64>,
    pub total_explained_variance_ratio: f64,
    pub reconstruction_error: f64,
    pub written: Vec<PathBuf>,
}

/// Loader → data matrix → PCA → reporter, per `config`.
///
/// # Errors
/// The first failing stage's error; nothing is retried and no partial summary
/// is returned.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineSummary> {
    let run_start_time = Instant::now();
    config.validate()?;

    let loaded = ImageLoader::new(&config.source_directory).load()?;
    let data = build_data_matrix(&loaded.images)?;

    let backend = config.backend.backend();
    let outcome = fit_and_reconstruct(
        backend.as_ref(),
        &data,
        config.component_count,
        config.strict_degeneracy,
    )?;
    let error = reconstruction_error(data.view(), outcome.reconstructed.view())?;
    let ratio = outcome.model.explained_variance_ratio();
    let total_ratio = ratio.sum();
    info!(
        "k={} retains {:.2}% of variance; reconstruction error {:.4e}",
        config.component_count,
        total_ratio * 100.0,
        error
    );

    let reporter = Reporter::new(&config.output_directory)?;
    let reconstructed_images = outcome.images()?;
    let mut written = reporter.write_reconstructions(&reconstructed_images, config.preview_count)?;
    if config.write_mean_face {
        written.push(reporter.write_mean_face(&outcome.mean_face()?)?);
    }
    if let Some(sheet_name) = &config.comparison_sheet {
        if let Some(path) = reporter.write_comparison_sheet(
            &loaded.images,
            &reconstructed_images,
            config.preview_count,
            sheet_name,
        )? {
            written.push(path);
        }
    }

    let mut summary = PipelineSummary {
        n_samples: data.n_samples(),
        height: data.height(),
        width: data.width(),
        n_components: outcome.model.n_components(),
        effective_rank: outcome.model.effective_rank(),
        explained_variance_ratio: ratio,
        total_explained_variance_ratio: total_ratio,
        reconstruction_error: error,
        written,
    };
    let summary_path = reporter.output_directory().join("summary.json");
    summary.written.push(summary_path);
    reporter.write_json(&summary, "summary.json")?;

    info!(
        "Wrote {} files to {} in {:?}",
        summary.written.len(),
        reporter.output_directory().display(),
        run_start_time.elapsed()
    );
    Ok(summary)
}
