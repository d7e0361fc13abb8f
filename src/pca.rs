// Principal component analysis of image data (eigenfaces)

use crate::error::{EigenfaceError, Result};
use crate::linalg_backends::{BackendSVD, NdarrayLinAlgBackend};
use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Residual norm under which a Gram-Schmidt step is considered to have
/// collapsed, and the candidate direction is replaced.
const ORTHO_COLLAPSE_TOL: f64 = 1e-8;

/// A fitted eigenface model.
///
/// Holds the mean face and the top-k principal components (as rows, shape
/// `(k, d)`) of a centered image data matrix, together with every singular
/// value of that matrix. Mean and components are computed once by `fit` and
/// are read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eigenfaces {
    /// Column-wise mean of the training data ("average face").
    /// Shape: (d)
    mean: Array1<f64>,
    /// Orthonormal principal components, ordered by descending singular value.
    /// Shape: (k, d)
    components: Array2<f64>,
    /// All singular values of the centered matrix, descending.
    /// Shape: (min(n, d))
    singular_values: Array1<f64>,
    n_samples: usize,
    effective_rank: usize,
}

impl Eigenfaces {
    /// Fits `n_components` eigenfaces to `data_matrix` with the default
    /// (LAPACK economy SVD) backend, tolerating degenerate variance.
    ///
    /// * `data_matrix` - shape (n_samples, n_features), one flattened image per row.
    /// * `n_components` - `k`, must satisfy `1 <= k <= min(n_samples, n_features)`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use eigenfaces::Eigenfaces;
    /// use ndarray::array;
    ///
    /// let x = array![[0.0, 1.0, 2.0], [2.0, 1.0, 0.0], [1.0, 1.0, 1.0]];
    /// let model = Eigenfaces::fit(x.view(), 2).unwrap();
    /// assert_eq!(model.components().dim(), (2, 3));
    /// ```
    pub fn fit(data_matrix: ArrayView2<f64>, n_components: usize) -> Result<Self> {
        Self::fit_with(&NdarrayLinAlgBackend, data_matrix, n_components, false)
    }

    /// Fits the model with an explicit decomposition backend.
    ///
    /// The data is centered, decomposed as `Xc = U · diag(S) · Vt` in economy
    /// form, and the first `n_components` rows of `Vt` become the components.
    ///
    /// Degenerate variance: singular values at or below
    /// `max(n, d) · ε · s_max` are treated as zero. Component rows belonging to
    /// such values are replaced by a deterministic orthonormal completion
    /// (standard basis vectors Gram-Schmidt'ed against the retained rows). They
    /// lie in the null space of the centered data, so their coefficients are
    /// zero and reconstructions are unaffected. With `strict_degeneracy` the
    /// fit fails instead.
    ///
    /// # Errors
    /// `EmptyDataset` for a matrix with no rows or columns,
    /// `InvalidComponentCount` when `n_components` is outside `[1, min(n, d)]`,
    /// `DegenerateVariance` (strict mode only) when the effective rank is below
    /// `n_components`, and `Decomposition` if the backend fails.
    pub fn fit_with<B: BackendSVD + ?Sized>(
        backend: &B,
        data_matrix: ArrayView2<f64>,
        n_components: usize,
        strict_degeneracy: bool,
    ) -> Result<Self> {
        let (n_samples, n_features) = data_matrix.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(EigenfaceError::EmptyDataset);
        }
        let max_components = n_samples.min(n_features);
        if n_components == 0 || n_components > max_components {
            return Err(EigenfaceError::InvalidComponentCount {
                requested: n_components,
                max: max_components,
            });
        }

        let (mean, centered) = center(data_matrix)?;

        let decomposition_start_time = Instant::now();
        let svd = backend.economy_svd(centered)?;
        debug!(
            "Economy SVD of {}x{} centered matrix in {:?}",
            n_samples,
            n_features,
            decomposition_start_time.elapsed()
        );

        if svd.vt.ncols() != n_features || svd.vt.nrows() < n_components || svd.s.len() != svd.vt.nrows() {
            return Err(EigenfaceError::Decomposition(format!(
                "backend returned vt={:?}, s={} for {} requested components of dimension {}",
                svd.vt.dim(),
                svd.s.len(),
                n_components,
                n_features
            )));
        }

        let threshold = null_singular_value_threshold(svd.s.view(), n_samples, n_features);
        let effective_rank = svd.s.iter().filter(|&&v| v > threshold).count();

        if effective_rank < n_components {
            if strict_degeneracy {
                return Err(EigenfaceError::DegenerateVariance {
                    rank: effective_rank,
                    requested: n_components,
                });
            }
            warn!(
                "Centered data has effective rank {} (< {} requested components); completing basis with null-space directions.",
                effective_rank, n_components
            );
        }

        let mut components = svd.vt.slice(s![..n_components, ..]).to_owned();
        orthonormalize_rows(&mut components, effective_rank.min(n_components));
        normalize_signs(&mut components);

        info!(
            "Fitted {} eigenfaces on {} samples of dimension {} (effective rank {})",
            n_components, n_samples, n_features, effective_rank
        );

        Ok(Self {
            mean,
            components,
            singular_values: svd.s,
            n_samples,
            effective_rank,
        })
    }

    /// Returns the mean vector ("average face"), shape (d).
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Returns the principal components as rows, shape (k, d).
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Returns every singular value of the centered training matrix, not just
    /// the retained ones.
    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    /// Number of singular values above the numerical-zero threshold.
    pub fn effective_rank(&self) -> usize {
        self.effective_rank
    }

    /// Variance captured by each retained component, `s_i² / (n - 1)`.
    ///
    /// Variance is undefined for a single sample; every entry is NaN then.
    pub fn explained_variance(&self) -> Array1<f64> {
        let k = self.n_components();
        let retained = self.singular_values.slice(s![..k]);
        if self.n_samples > 1 {
            let denom = (self.n_samples - 1) as f64;
            retained.mapv(|s_val| s_val * s_val / denom)
        } else {
            Array1::from_elem(k, f64::NAN)
        }
    }

    /// Fraction of total variance captured by each retained component.
    ///
    /// All zeros when the dataset has no variance at all.
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        let k = self.n_components();
        let total: f64 = self.singular_values.iter().map(|v| v * v).sum();
        if total > 0.0 {
            self.singular_values
                .slice(s![..k])
                .mapv(|s_val| s_val * s_val / total)
        } else {
            Array1::zeros(k)
        }
    }

    /// Projects samples onto the components: `(X - mean) · PCᵗ`.
    ///
    /// * `samples` - shape (m, d); returns shape (m, k).
    ///
    /// # Errors
    /// `DimensionMismatch` if `samples` does not have `d` columns.
    pub fn project(&self, samples: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_features(samples.ncols())?;
        let centered = &samples - &self.mean;
        Ok(centered.dot(&self.components.t()))
    }

    /// Single-sample form of [`Eigenfaces::project`].
    pub fn project_one(&self, sample: ArrayView1<f64>) -> Result<Array1<f64>> {
        self.check_features(sample.len())?;
        let centered = &sample - &self.mean;
        Ok(centered.dot(&self.components.t()))
    }

    /// Maps coefficients back to pixel space: `Z · PC + mean`.
    ///
    /// This is the least-squares optimal rank-k approximation of the projected
    /// samples; it is exact only when `k` equals the rank of the centered data.
    ///
    /// * `coefficients` - shape (m, k); returns shape (m, d).
    ///
    /// # Errors
    /// `DimensionMismatch` if `coefficients` does not have `k` columns.
    pub fn reconstruct(&self, coefficients: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_components(coefficients.ncols())?;
        Ok(coefficients.dot(&self.components) + &self.mean)
    }

    /// Single-sample form of [`Eigenfaces::reconstruct`].
    pub fn reconstruct_one(&self, coefficients: ArrayView1<f64>) -> Result<Array1<f64>> {
        self.check_components(coefficients.len())?;
        Ok(coefficients.dot(&self.components) + &self.mean)
    }

    fn check_features(&self, found: usize) -> Result<()> {
        if found != self.n_features() {
            return Err(EigenfaceError::DimensionMismatch {
                expected: self.n_features(),
                found,
            });
        }
        Ok(())
    }

    fn check_components(&self, found: usize) -> Result<()> {
        if found != self.n_components() {
            return Err(EigenfaceError::DimensionMismatch {
                expected: self.n_components(),
                found,
            });
        }
        Ok(())
    }
}

/// Computes the column-wise mean and the row-centered matrix `X - mean`.
///
/// # Errors
/// `EmptyDataset` if the matrix has no rows.
pub fn center(data_matrix: ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let mean = data_matrix
        .mean_axis(Axis(0))
        .ok_or(EigenfaceError::EmptyDataset)?;
    let centered = &data_matrix - &mean;
    Ok((mean, centered))
}

/// Sum of squared differences between two equally shaped matrices.
///
/// # Errors
/// `DimensionMismatch` (in element counts) if the shapes differ.
pub fn reconstruction_error(original: ArrayView2<f64>, reconstructed: ArrayView2<f64>) -> Result<f64> {
    if original.dim() != reconstructed.dim() {
        return Err(EigenfaceError::DimensionMismatch {
            expected: original.len(),
            found: reconstructed.len(),
        });
    }
    Ok(original
        .iter()
        .zip(reconstructed.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum())
}

/// Reshapes a sample vector into an `(height, width)` image, row-major.
///
/// Exact inverse of [`crate::data_matrix::flatten`]: no rounding happens here.
///
/// # Errors
/// `DimensionMismatch` if `vector.len() != height * width`.
pub fn reshape_to_image(vector: ArrayView1<f64>, height: usize, width: usize) -> Result<Array2<f64>> {
    let expected = height * width;
    if vector.len() != expected {
        return Err(EigenfaceError::DimensionMismatch {
            expected,
            found: vector.len(),
        });
    }
    Array2::from_shape_vec((height, width), vector.iter().copied().collect()).map_err(|_| {
        EigenfaceError::DimensionMismatch {
            expected,
            found: vector.len(),
        }
    })
}

/// Converts a reconstructed pixel value to an 8-bit intensity.
///
/// NaN maps to 0; everything else is clamped to `[0, 255]` and rounded half
/// away from zero.
pub fn clip_intensity(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.clamp(0.0, 255.0).round() as u8
    }
}

/// Applies [`clip_intensity`] to every pixel of a reconstructed image.
pub fn to_intensity_grid(image: &Array2<f64>) -> Array2<u8> {
    image.mapv(clip_intensity)
}

/// Singular values at or below this are numerically zero.
fn null_singular_value_threshold(singular_values: ArrayView1<f64>, n_rows: usize, n_cols: usize) -> f64 {
    let largest = singular_values.iter().cloned().fold(0.0_f64, f64::max);
    largest * (n_rows.max(n_cols) as f64) * f64::EPSILON
}

/// Makes the rows of `basis` orthonormal in place.
///
/// The first `trusted` rows come from the decomposition and are only
/// re-orthogonalized. The remaining rows (and any trusted row that collapses)
/// are replaced by standard basis vectors projected off the rows before them.
fn orthonormalize_rows(basis: &mut Array2<f64>, trusted: usize) {
    let (n_rows, dim) = basis.dim();
    let mut next_candidate = 0usize;

    for i in 0..n_rows {
        let mut residual = if i < trusted {
            basis.row(i).to_owned()
        } else {
            Array1::zeros(dim)
        };
        let mut norm = if i < trusted {
            orthogonalize_against(&mut residual, basis.slice(s![..i, ..]))
        } else {
            0.0
        };

        // Each standard basis vector is tried once. Some e_j always keeps a
        // residual norm of at least 1/sqrt(dim) while i < dim.
        let min_candidate_norm = 0.5 / (dim as f64).sqrt();
        while norm <= ORTHO_COLLAPSE_TOL && next_candidate < dim {
            let mut candidate = Array1::<f64>::zeros(dim);
            candidate[next_candidate] = 1.0;
            next_candidate += 1;
            let candidate_norm = orthogonalize_against(&mut candidate, basis.slice(s![..i, ..]));
            if candidate_norm >= min_candidate_norm {
                residual = candidate;
                norm = candidate_norm;
            }
        }

        if norm > ORTHO_COLLAPSE_TOL {
            residual.mapv_inplace(|x| x / norm);
        }
        basis.row_mut(i).assign(&residual);
    }
}

/// Two passes of classical Gram-Schmidt against the rows of `previous`.
/// Returns the norm of what is left.
fn orthogonalize_against(vector: &mut Array1<f64>, previous: ArrayView2<f64>) -> f64 {
    for _ in 0..2 {
        if previous.nrows() > 0 {
            let overlaps = previous.dot(&*vector);
            *vector -= &previous.t().dot(&overlaps);
        }
    }
    vector.dot(&*vector).sqrt()
}

/// Flips each row so its largest-magnitude entry is positive. Reconstruction is
/// sign-invariant; this only makes fits comparable across backends.
fn normalize_signs(basis: &mut Array2<f64>) {
    for mut row in basis.rows_mut() {
        let pivot = row
            .iter()
            .cloned()
            .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        if pivot < 0.0 {
            row.mapv_inplace(|x| -x);
        }
    }
}
