//! Output side of a run: reconstructed images, the mean face, a side-by-side
//! comparison sheet and a JSON summary, all written under one directory.
use crate::error::{EigenfaceError, Result};
use crate::pca::to_intensity_grid;
use image::GrayImage;
use log::debug;
use ndarray::{s, Array2};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Gap between tiles of the comparison sheet, in pixels.
pub const SHEET_GUTTER: usize = 4;
const SHEET_BACKGROUND: u8 = 128;

#[derive(Debug, Clone)]
pub struct Reporter {
    output_directory: PathBuf,
}

impl Reporter {
    /// Creates the output directory if it does not exist yet.
    pub fn new(output_directory: impl Into<PathBuf>) -> Result<Self> {
        let output_directory = output_directory.into();
        fs::create_dir_all(&output_directory).map_err(|source| EigenfaceError::Io {
            path: output_directory.clone(),
            source,
        })?;
        Ok(Self { output_directory })
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Writes `recon_1.png`, `recon_2.png`, ... for the first
    /// `min(count, reconstructions.len())` images, clipped to 8 bits.
    pub fn write_reconstructions(&self, reconstructions: &[Array2<f64>], count: usize) -> Result<Vec<PathBuf>> {
        reconstructions
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, image)| {
                let path = self.output_directory.join(format!("recon_{}.png", i + 1));
                save_grayscale(&to_intensity_grid(image), &path)?;
                Ok::<_, EigenfaceError>(path)
            })
            .collect()
    }

    /// Writes the average face as `mean_face.png`.
    pub fn write_mean_face(&self, mean_face: &Array2<f64>) -> Result<PathBuf> {
        let path = self.output_directory.join("mean_face.png");
        save_grayscale(&to_intensity_grid(mean_face), &path)?;
        Ok(path)
    }

    /// Tiles originals (top row) over their reconstructions (bottom row) into one
    /// grayscale image. Returns `None` when there is nothing to show.
    ///
    /// # Errors
    /// `ShapeMismatch` if the tiles do not all share the first original's shape.
    pub fn write_comparison_sheet(
        &self,
        originals: &[Array2<u8>],
        reconstructions: &[Array2<f64>],
        count: usize,
        file_name: &Path,
    ) -> Result<Option<PathBuf>> {
        let shown = count.min(originals.len()).min(reconstructions.len());
        if shown == 0 {
            return Ok(None);
        }
        let (height, width) = originals[0].dim();

        let sheet_height = 2 * height + 3 * SHEET_GUTTER;
        let sheet_width = shown * width + (shown + 1) * SHEET_GUTTER;
        let mut sheet = Array2::<u8>::from_elem((sheet_height, sheet_width), SHEET_BACKGROUND);

        for i in 0..shown {
            let x0 = SHEET_GUTTER + i * (width + SHEET_GUTTER);
            let tiles = [
                (SHEET_GUTTER, originals[i].clone()),
                (2 * SHEET_GUTTER + height, to_intensity_grid(&reconstructions[i])),
            ];
            for (y0, tile) in tiles {
                if tile.dim() != (height, width) {
                    return Err(EigenfaceError::ShapeMismatch {
                        index: i,
                        expected: (height, width),
                        found: tile.dim(),
                    });
                }
                sheet
                    .slice_mut(s![y0..y0 + height, x0..x0 + width])
                    .assign(&tile);
            }
        }

        let path = self.output_directory.join(file_name);
        save_grayscale(&sheet, &path)?;
        Ok(Some(path))
    }

    /// Serializes `value` as pretty JSON to `file_name` inside the output directory.
    pub fn write_json<T: Serialize>(&self, value: &T, file_name: &str) -> Result<PathBuf> {
        let path = self.output_directory.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).map_err(|source| EigenfaceError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Saves an 8-bit grid as a grayscale image; the format follows the extension.
pub fn save_grayscale(grid: &Array2<u8>, path: &Path) -> Result<()> {
    let (height, width) = grid.dim();
    let buffer = GrayImage::from_raw(width as u32, height as u32, grid.iter().copied().collect())
        .ok_or(EigenfaceError::DimensionMismatch {
            expected: width * height,
            found: grid.len(),
        })?;
    buffer.save(path).map_err(|source| EigenfaceError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {}", path.display());
    Ok(())
}
