// src/data_matrix.rs

use crate::error::{EigenfaceError, Result};
use ndarray::{Array1, Array2, ArrayView2};

/// `n × d` sample matrix built from equally sized images, plus the
/// `(height, width)` needed to turn rows back into images.
#[derive(Debug, Clone)]
pub struct DataMatrix {
    matrix: Array2<f64>,
    height: usize,
    width: usize,
}

impl DataMatrix {
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn n_samples(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.matrix
    }
}

/// Flattens an image into a sample vector in row-major (raster) order.
///
/// Iteration over an ndarray is always in logical row-major order, whatever the
/// memory layout, so transposed or sliced views flatten the same way.
pub fn flatten<T: Copy + Into<f64>>(image: &Array2<T>) -> Array1<f64> {
    image.iter().map(|&v| v.into()).collect()
}

/// Stacks flattened images into a data matrix, preserving input order.
///
/// # Errors
/// `EmptyDataset` when `images` is empty, `ShapeMismatch` when an image does not
/// share the first image's shape. The loader resizes everything up front, so the
/// latter only fires when the builder is used directly.
pub fn build_data_matrix<T: Copy + Into<f64>>(images: &[Array2<T>]) -> Result<DataMatrix> {
    let first = images.first().ok_or(EigenfaceError::EmptyDataset)?;
    let (height, width) = first.dim();
    if height == 0 || width == 0 {
        return Err(EigenfaceError::ShapeMismatch {
            index: 0,
            expected: (height.max(1), width.max(1)),
            found: (height, width),
        });
    }

    let mut matrix = Array2::<f64>::zeros((images.len(), height * width));
    for (index, (mut row, image)) in matrix.rows_mut().into_iter().zip(images).enumerate() {
        if image.dim() != (height, width) {
            return Err(EigenfaceError::ShapeMismatch {
                index,
                expected: (height, width),
                found: image.dim(),
            });
        }
        for (dst, &src) in row.iter_mut().zip(image.iter()) {
            *dst = src.into();
        }
    }

    log::debug!(
        "Built data matrix of {} samples x {} features from {}x{} images",
        matrix.nrows(),
        matrix.ncols(),
        height,
        width
    );
    Ok(DataMatrix {
        matrix,
        height,
        width,
    })
}
