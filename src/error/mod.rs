//! Error taxonomy for loading, analyzing and rendering benchmark results.
//!
//! Every variant names the file, column or metric that triggered it so a
//! failed run can be traced back to its input without a debugger.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The input file is missing, unreadable or malformed.
    #[error("Failed to load dataset {path}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    /// A column required by the selected analysis is absent.
    #[error("Required column '{column}' is missing from {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Statistics were requested for a series without samples.
    #[error("Series '{label}' is empty: mean and standard deviation are undefined")]
    EmptySeries { label: String },

    /// Two series that must be paired have different lengths (or fewer than two pairs).
    #[error("Series '{left}' ({left_len} samples) and '{right}' ({right_len} samples) cannot be paired: equal lengths of at least 2 are required")]
    MismatchedLength {
        left: String,
        right: String,
        left_len: usize,
        right_len: usize,
    },

    /// A consumer would divide by a zero mean (or by a zero coefficient of variation).
    #[error("Division by a zero mean for '{label}'")]
    DegenerateMean { label: String },

    /// An elementwise division hit a zero denominator.
    #[error("Division by zero in '{label}' at iteration index {index}")]
    DivideByZero { label: String, index: usize },

    /// A probability distribution could not be constructed.
    #[error("Invalid distribution parameters: {message}")]
    Distribution { message: String },

    /// The configuration file could not be read or parsed.
    #[error("Invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// IO error while writing an output artifact.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The plotting backend failed to draw a chart.
    #[error("Chart rendering failed: {message}")]
    Render { message: String },

    /// JSON export failed.
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl AnalysisError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn render(err: impl std::fmt::Display) -> Self {
        Self::Render {
            message: err.to_string(),
        }
    }
}
