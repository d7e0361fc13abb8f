//! Image discovery and decoding.
//!
//! - `ImageLoader::discover`: list png/jpg/jpeg files in a directory, sorted by name.
//! - `ImageLoader::load`: decode them to 8-bit grayscale, resampling every image
//!   to the size of the first one.
use crate::error::{EigenfaceError, Result};
use image::imageops::{self, FilterType};
use image::GrayImage;
use log::{debug, info};
use ndarray::Array2;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Recognized file extensions, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Equally sized grayscale images, in discovery order.
#[derive(Debug, Clone)]
pub struct LoadedImages {
    /// One `(height, width)` grid per file.
    pub images: Vec<Array2<u8>>,
    pub paths: Vec<PathBuf>,
    pub height: usize,
    pub width: usize,
}

impl LoadedImages {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ImageLoader {
    directory: PathBuf,
}

impl ImageLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Lists eligible image files directly under the directory.
    ///
    /// # Errors
    /// `Io` if the directory cannot be read, `NoImagesFound` if nothing matches.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let io_error = |source: std::io::Error| EigenfaceError::Io {
            path: self.directory.clone(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.directory).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && has_image_extension(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(EigenfaceError::NoImagesFound {
                directory: self.directory.clone(),
            });
        }
        paths.sort();
        debug!("Discovered {} image files in {}", paths.len(), self.directory.display());
        Ok(paths)
    }

    /// Decodes every discovered file to grayscale.
    ///
    /// The first file fixes the reference `(width, height)`; the others are
    /// resampled to it with a Lanczos3 filter. Decoding runs in parallel but the
    /// result keeps discovery order.
    ///
    /// # Errors
    /// Anything `discover` reports, or `ImageDecode` for unreadable content.
    pub fn load(&self) -> Result<LoadedImages> {
        let load_start_time = Instant::now();
        let paths = self.discover()?;

        let (first_path, rest) = paths
            .split_first()
            .ok_or_else(|| EigenfaceError::NoImagesFound {
                directory: self.directory.clone(),
            })?;
        let first = decode_grayscale(first_path)?;
        let (width, height) = first.dimensions();

        let mut images = Vec::with_capacity(paths.len());
        images.push(gray_to_array(first)?);
        let rest_images = rest
            .par_iter()
            .map(|path| {
                let decoded = decode_grayscale(path)?;
                let resized = if decoded.dimensions() != (width, height) {
                    debug!(
                        "Resizing {} from {:?} to {}x{}",
                        path.display(),
                        decoded.dimensions(),
                        width,
                        height
                    );
                    imageops::resize(&decoded, width, height, FilterType::Lanczos3)
                } else {
                    decoded
                };
                gray_to_array(resized)
            })
            .collect::<Result<Vec<_>>>()?;
        images.extend(rest_images);

        info!(
            "Loaded {} images of size {}x{} from {} in {:?}",
            images.len(),
            height,
            width,
            self.directory.display(),
            load_start_time.elapsed()
        );
        Ok(LoadedImages {
            images,
            paths,
            height: height as usize,
            width: width as usize,
        })
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn decode_grayscale(path: &Path) -> Result<GrayImage> {
    let img = image::open(path).map_err(|source| EigenfaceError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.into_luma8())
}

fn gray_to_array(img: GrayImage) -> Result<Array2<u8>> {
    let (width, height) = img.dimensions();
    let expected = width as usize * height as usize;
    let raw = img.into_raw();
    let found = raw.len();
    Array2::from_shape_vec((height as usize, width as usize), raw)
        .map_err(|_| EigenfaceError::DimensionMismatch { expected, found })
}
