use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};

/// Column names written by the benchmark runner.
pub mod columns {
    pub const ITERATION: &str = "iteration";
    pub const SUPER_TIME: &str = "super_time";
    pub const SUPER_MEMORY: &str = "super_memory";
    pub const SUPER_CPU: &str = "super_cpu";
    pub const PAR_TOTAL_TIME: &str = "par_total_time";
    pub const PAR_QUERY_TIME: &str = "par_query_time";
    pub const PAR_COMBINATION_TIME: &str = "par_combination_time";
    pub const PAR_MEMORY: &str = "par_memory";
    pub const PAR_CPU: &str = "par_cpu";
    pub const SEQ_TOTAL_TIME: &str = "seq_total_time";
    pub const SEQ_FINAL_TIME: &str = "seq_final_time";
    pub const SEQ_COMBINATION_TIME: &str = "seq_combination_time";
    pub const SPEEDUP_RATIO: &str = "speedup_ratio";
    // Layout of the first 10-run benchmark export.
    pub const PARALLEL_TOTAL_TIME: &str = "parallel_total_time";
    pub const PARALLEL_QUERY_TIME: &str = "parallel_query_time";
}

/// A query-execution approach being benchmarked.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    SuperQuery,
    ParallelJoin,
    Sequential,
}

impl Strategy {
    pub fn display_name(&self) -> &'static str {
        match self {
            Strategy::SuperQuery => "Super Query",
            Strategy::ParallelJoin => "Parallel+Join",
            Strategy::Sequential => "Sequential",
        }
    }

    /// Label used where space is tight (box plot ticks, radar legend).
    pub fn short_name(&self) -> &'static str {
        match self {
            Strategy::SuperQuery => "Super",
            Strategy::ParallelJoin => "Parallel",
            Strategy::Sequential => "Sequential",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A measured (or derived) quantity with its unit and report precision.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    ExecutionTime,
    QueryTime,
    CombinationTime,
    CpuTime,
    Memory,
    Ratio,
    Percent,
}

impl Metric {
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::ExecutionTime | Metric::QueryTime | Metric::CombinationTime | Metric::CpuTime => "ms",
            Metric::Memory => "MB",
            Metric::Ratio => "x",
            Metric::Percent => "%",
        }
    }

    /// Decimal places used when the metric is printed.
    pub fn precision(&self) -> usize {
        match self {
            Metric::CpuTime | Metric::Percent => 1,
            _ => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::ExecutionTime => "Execution Time",
            Metric::QueryTime => "Query Execution Time",
            Metric::CombinationTime => "Combination Time",
            Metric::CpuTime => "CPU Usage",
            Metric::Memory => "Memory Usage",
            Metric::Ratio => "Speedup Ratio",
            Metric::Percent => "Improvement",
        }
    }

    /// Axis label such as `Execution Time (ms)`.
    pub fn axis_label(&self) -> String {
        format!("{} ({})", self.name(), self.unit())
    }

    /// Formats a value with the metric's precision, without the unit.
    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.precision(), value)
    }
}

/// One sample per iteration for a single (strategy, metric) pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Series {
    /// Source column, or a description for derived series.
    pub label: String,
    pub strategy: Option<Strategy>,
    pub metric: Metric,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(label: impl Into<String>, strategy: Option<Strategy>, metric: Metric, values: Vec<f64>) -> Self {
        Series {
            label: label.into(),
            strategy,
            metric,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name shown in legends: the strategy if known, the label otherwise.
    pub fn display_name(&self) -> String {
        match self.strategy {
            Some(strategy) => strategy.display_name().to_string(),
            None => self.label.clone(),
        }
    }

    /// Returns a copy carrying different values, keeping label, strategy and metric.
    pub fn with_values(&self, values: Vec<f64>) -> Self {
        Series {
            label: self.label.clone(),
            strategy: self.strategy,
            metric: self.metric,
            values,
        }
    }
}

/// A benchmark export: named numeric columns, one row per iteration.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    header: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Dataset {
    /// Loads a dataset from a CSV file with a header row.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AnalysisError::data_load(path, "file does not exist or is not a regular file"));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| AnalysisError::data_load(path, e.to_string()))?;

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| AnalysisError::data_load(path, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        if header.is_empty() || header.iter().all(String::is_empty) {
            return Err(AnalysisError::data_load(path, "missing header row"));
        }

        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); header.len()];

        // Parse every cell as a float, rejecting the whole file on the first bad cell
        for record in reader.records() {
            let record = record.map_err(|e| AnalysisError::data_load(path, e.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            for (i, field) in record.iter().enumerate() {
                let value = field.parse::<f64>().map_err(|_| {
                    AnalysisError::data_load(
                        path,
                        format!("line {}: column '{}' value '{}' is not a number", line, header[i], field),
                    )
                })?;
                if !value.is_finite() {
                    return Err(AnalysisError::data_load(
                        path,
                        format!("line {}: column '{}' value '{}' is not finite", line, header[i], field),
                    ));
                }
                columns[i].push(value);
            }
        }

        let dataset = Dataset::new(path, header, columns)?;
        debug!(
            "Loaded {} rows x {} columns from {}",
            dataset.len(),
            dataset.header.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Builds a dataset from in-memory columns.
    pub fn from_columns(path: impl Into<PathBuf>, columns: Vec<(&str, Vec<f64>)>) -> Result<Self> {
        let (header, columns): (Vec<String>, Vec<Vec<f64>>) = columns
            .into_iter()
            .map(|(name, values)| (name.to_string(), values))
            .unzip();
        Dataset::new(path.into(), header, columns)
    }

    fn new(path: impl Into<PathBuf>, header: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        let path = path.into();

        let mut seen = HashSet::new();
        for name in &header {
            if !seen.insert(name.as_str()) {
                return Err(AnalysisError::data_load(&path, format!("duplicate column '{}'", name)));
            }
        }

        if let Some(first) = columns.first() {
            if let Some((i, _)) = columns.iter().enumerate().find(|(_, c)| c.len() != first.len()) {
                return Err(AnalysisError::data_load(
                    &path,
                    format!(
                        "column '{}' has {} rows, expected {}",
                        header[i],
                        columns[i].len(),
                        first.len()
                    ),
                ));
            }
        }

        Ok(Dataset { path, header, columns })
    }

    /// Number of rows (iterations).
    pub fn len(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.header.iter().any(|h| h == name)
    }

    /// Fails with `MissingColumn` on the first absent column.
    pub fn require(&self, required: &[&str]) -> Result<()> {
        match required.iter().find(|name| !self.has_column(name)) {
            Some(name) => Err(AnalysisError::MissingColumn {
                column: name.to_string(),
                path: self.path.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.header
            .iter()
            .position(|h| h == name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Typed access to a column as a measurement series.
    pub fn series(&self, name: &str, strategy: Option<Strategy>, metric: Metric) -> Result<Series> {
        Ok(Series::new(name, strategy, metric, self.column(name)?.to_vec()))
    }

    /// Iteration numbers used as the x axis of time-series panels.
    pub fn iterations(&self) -> Result<Vec<f64>> {
        Ok(self.column(columns::ITERATION)?.to_vec())
    }
}

/// Loads a dataset and checks that every required column is present.
pub fn load_dataset<P: AsRef<Path>>(path: P, required: &[&str]) -> Result<Dataset> {
    let dataset = Dataset::load(path)?;
    dataset.require(required)?;
    Ok(dataset)
}

/// Lists the CSV files of a directory in name order.
pub fn find_datasets<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();

    // Read the directory
    let entries = fs::read_dir(dir).map_err(|e| AnalysisError::data_load(dir, e.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| AnalysisError::data_load(dir, e.to_string()))?;
        let path = entry.path();

        // Check if the path is a file and has a .csv extension
        if path.is_file() && path.extension().map(|ext| ext == "csv").unwrap_or(false) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
