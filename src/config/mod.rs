use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};

/// Settings shared by every analysis run.
///
/// Values come from the defaults below, optionally replaced by a JSON file
/// (`--config`), and finally by individual command-line flags.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory the chart image and JSON exports are written to.
    pub output_dir: PathBuf,
    /// Width of the chart composite in pixels.
    pub image_width: u32,
    /// Height of the chart composite in pixels.
    pub image_height: u32,
    /// Histogram bin count for distribution panels (cpu/memory use this, ratio histograms use `ratio_bins`).
    pub histogram_bins: usize,
    /// Histogram bin count for speedup-ratio distributions.
    pub ratio_bins: usize,
    /// Quantile below which memory readings are treated as collector artifacts.
    pub outlier_percentile: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            output_dir: PathBuf::from("."),
            image_width: 2000,
            image_height: 1600,
            histogram_bins: 12,
            ratio_bins: 10,
            outlier_percentile: 0.1,
        }
    }
}

impl AnalysisConfig {
    /// Loads a configuration from a JSON file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| AnalysisError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: AnalysisConfig =
            serde_json::from_str(&content).map_err(|e| AnalysisError::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.validate(path)?;
        Ok(config)
    }

    /// Rejects values no analysis can work with.
    pub fn validate(&self, origin: &Path) -> Result<()> {
        let invalid = |reason: String| AnalysisError::Config {
            path: origin.to_path_buf(),
            reason,
        };

        if self.image_width == 0 || self.image_height == 0 {
            return Err(invalid(format!(
                "image size must be positive, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if self.histogram_bins == 0 || self.ratio_bins == 0 {
            return Err(invalid("histogram bin counts must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.outlier_percentile) {
            return Err(invalid(format!(
                "outlier_percentile must lie in [0, 1], got {}",
                self.outlier_percentile
            )));
        }
        Ok(())
    }

    /// Path of an artifact inside the output directory.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
