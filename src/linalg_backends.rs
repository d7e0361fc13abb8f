// src/linalg_backends.rs

use crate::error::{EigenfaceError, Result};
use ndarray::{Array1, Array2};
use ndarray_linalg::{Eigh, JobSvd, SVDDCInto, UPLO};
use serde::{Deserialize, Serialize};

/// Economy-size singular value decomposition `A = U · diag(s) · Vt`.
///
/// For an `n × d` input with `r = min(n, d)`:
/// `u` is `n × r`, `s` has length `r` (descending, non-negative), `vt` is `r × d`.
#[derive(Debug)]
pub struct SVDOutput {
    pub u: Array2<f64>,
    pub s: Array1<f64>,
    pub vt: Array2<f64>,
}

/// Trait for the decomposition the PCA engine is built on.
///
/// Implementations must never allocate a `d × d` matrix; the pixel count `d`
/// is usually far larger than the number of images.
pub trait BackendSVD {
    fn economy_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput>;
}

/// Which decomposition strategy a pipeline run uses.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvdBackendKind {
    /// LAPACK divide-and-conquer SVD (`gesdd`) in reduced form.
    #[default]
    EconomySvd,
    /// Eigendecomposition of the `n × n` Gram matrix.
    ///
    /// Directions with `s_i / s_max` below about `1e-5` are dropped (see
    /// [`GramEighBackend`]), so this backend can report a lower effective rank
    /// than `EconomySvd` on the same data. With `strict_degeneracy` it may then
    /// reject a fit that `EconomySvd` accepts.
    GramEigh,
}

impl SvdBackendKind {
    pub fn backend(self) -> Box<dyn BackendSVD> {
        match self {
            SvdBackendKind::EconomySvd => Box::new(NdarrayLinAlgBackend),
            SvdBackendKind::GramEigh => Box::new(GramEighBackend),
        }
    }
}

fn to_decomposition_error<E: std::fmt::Display>(e: E) -> EigenfaceError {
    EigenfaceError::Decomposition(e.to_string())
}

/// ndarray-linalg backed economy SVD.
#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

impl BackendSVD for NdarrayLinAlgBackend {
    fn economy_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput> {
        let (n_rows, n_cols) = matrix.dim();
        let (u, s, vt) = matrix
            .svddc_into(JobSvd::Some)
            .map_err(to_decomposition_error)?;
        let u = u.ok_or_else(|| {
            EigenfaceError::Decomposition("SVD did not return left singular vectors".into())
        })?;
        let vt = vt.ok_or_else(|| {
            EigenfaceError::Decomposition("SVD did not return right singular vectors".into())
        })?;

        let rank_bound = n_rows.min(n_cols);
        if s.len() != rank_bound || vt.dim() != (rank_bound, n_cols) || u.dim() != (n_rows, rank_bound) {
            return Err(EigenfaceError::Decomposition(format!(
                "unexpected economy SVD shapes: u={:?}, s={}, vt={:?} for a {}x{} input",
                u.dim(),
                s.len(),
                vt.dim(),
                n_rows,
                n_cols
            )));
        }
        Ok(SVDOutput { u, s, vt })
    }
}

/// Eigenvalues of the Gram matrix below this fraction of the largest one are
/// treated as zero. Squaring in `X·Xᵗ` halves the usable precision, so the
/// cutoff is far looser than machine epsilon.
const GRAM_RELATIVE_CUTOFF: f64 = 1e-10;

/// The "Gram trick": decompose `X·Xᵗ` (n × n) and lift each eigenvector back to
/// pixel space with `Xᵗ u / ‖Xᵗ u‖`.
///
/// Cheaper than a full SVD when `n ≪ d`, at the cost of precision on small
/// singular values. Directions whose eigenvalue falls under the cutoff are
/// returned as zero rows with a zero singular value, which the PCA engine then
/// counts as null and completes. Those completed rows are not guaranteed to be
/// orthogonal to the small dropped variance.
#[derive(Debug, Default, Copy, Clone)]
pub struct GramEighBackend;

impl BackendSVD for GramEighBackend {
    fn economy_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput> {
        let (n_rows, n_cols) = matrix.dim();
        let rank_bound = n_rows.min(n_cols);

        let gram_matrix = matrix.dot(&matrix.t());
        let (eigenvalues, eigenvectors) = gram_matrix
            .eigh(UPLO::Upper)
            .map_err(to_decomposition_error)?;

        // eigh returns ascending order
        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| {
            eigenvalues[b]
                .partial_cmp(&eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let largest = order.first().map_or(0.0, |&i| eigenvalues[i].max(0.0));
        let cutoff = largest * GRAM_RELATIVE_CUTOFF;

        let mut u = Array2::<f64>::zeros((n_rows, rank_bound));
        let mut s = Array1::<f64>::zeros(rank_bound);
        let mut vt = Array2::<f64>::zeros((rank_bound, n_cols));

        for (i, &idx) in order.iter().take(rank_bound).enumerate() {
            let u_col = eigenvectors.column(idx);
            u.column_mut(i).assign(&u_col);

            let eigval = eigenvalues[idx].max(0.0);
            if largest <= 0.0 || eigval <= cutoff {
                continue;
            }

            let mut axis = matrix.t().dot(&u_col);
            let norm = axis.dot(&axis).sqrt();
            if norm > 0.0 {
                axis.mapv_inplace(|x| x / norm);
                vt.row_mut(i).assign(&axis);
                s[i] = eigval.sqrt();
            }
        }

        Ok(SVDOutput { u, s, vt })
    }
}
