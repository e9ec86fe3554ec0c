pub mod analysis;
pub mod charts;
pub mod comparison;
pub mod config;
pub mod dataset;
pub mod error;
pub mod plot;
pub mod report;
pub mod statistics;

pub use analysis::{Analysis, AnalysisOutput};
pub use comparison::{compare, speedup_ratios, Comparison};
pub use config::AnalysisConfig;
pub use dataset::{load_dataset, Dataset, Metric, Series, Strategy};
pub use error::{AnalysisError, Result};
pub use report::render_report;
pub use statistics::{summarize, Summary};
