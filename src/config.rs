use crate::error::{EigenfaceError, Result};
use crate::linalg_backends::SvdBackendKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for a single eigenface run.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "source_directory": "faces", "component_count": 20, "preview_count": 8 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned (non-recursively) for png/jpg/jpeg files.
    pub source_directory: PathBuf,
    /// Number of principal components `k`.
    pub component_count: usize,
    /// How many reconstructions to write and show in the comparison sheet.
    pub preview_count: usize,
    pub output_directory: PathBuf,
    pub backend: SvdBackendKind,
    /// Fail instead of completing the basis when the data has fewer than `k`
    /// directions of non-zero variance.
    pub strict_degeneracy: bool,
    pub write_mean_face: bool,
    /// File name (inside `output_directory`) of the original-vs-reconstruction
    /// sheet. `null` disables it.
    pub comparison_sheet: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_directory: PathBuf::from("assets"),
            component_count: 10,
            preview_count: 5,
            output_directory: PathBuf::from("results"),
            backend: SvdBackendKind::default(),
            strict_degeneracy: false,
            write_mean_face: true,
            comparison_sheet: Some(PathBuf::from("comparison.png")),
        }
    }
}

impl PipelineConfig {
    /// Checks what can be checked before any image is loaded. The upper bound
    /// on `component_count` depends on the dataset and is enforced at fit time.
    pub fn validate(&self) -> Result<()> {
        if self.component_count == 0 {
            // no dataset yet, so only the lower bound applies
            return Err(EigenfaceError::InvalidComponentCount {
                requested: 0,
                max: usize::MAX,
            });
        }
        if self.source_directory.as_os_str().is_empty() {
            return Err(EigenfaceError::Config(
                "source_directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads and validates a JSON config file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let data = fs::read_to_string(path).map_err(|e| {
        EigenfaceError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let config: PipelineConfig = serde_json::from_str(&data).map_err(|e| {
        EigenfaceError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}
