pub mod basic;
pub mod comprehensive;
pub mod cpu;
pub mod memory;
pub mod performance;
pub mod realistic;
pub mod resource;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::charts::{self, ChartSet, Panel, Spread};
use crate::comparison::{divergent_ratios, Comparison};
use crate::config::AnalysisConfig;
use crate::dataset::{columns, Dataset, Metric, Strategy};
use crate::error::{AnalysisError, Result};
use crate::plot::draw_chart_set;
use crate::report::{format_cv, statistic_table};
use crate::statistics::{self, SummarizedSeries, Summary};

/// Relative divergence above which a recorded speedup ratio is reported.
const RATIO_TOLERANCE: f64 = 0.01;

/// One way of analyzing a benchmark CSV: which columns it needs, what it
/// computes, how it charts it and how it narrates it.
pub trait Analysis {
    /// Name used on the command line.
    fn name(&self) -> &'static str;

    /// Title of the chart set and the report banner.
    fn title(&self) -> &'static str;

    fn required_columns(&self) -> &'static [&'static str];

    /// Default file name of the rendered chart set.
    fn image_name(&self) -> &'static str;

    /// Computes everything for the run. Nothing is written here.
    fn analyze(&self, dataset: &Dataset, config: &AnalysisConfig) -> Result<AnalysisOutput>;
}

/// Everything an analysis run produces, computed before any output is written.
#[derive(Serialize, Debug, Clone)]
pub struct AnalysisOutput {
    pub variant: String,
    pub summaries: Vec<Summary>,
    pub comparisons: Vec<Comparison>,
    pub charts: ChartSet,
    pub report: String,
}

impl AnalysisOutput {
    pub fn new(
        variant: &dyn Analysis,
        bundles: &[SummarizedSeries],
        comparisons: Vec<Comparison>,
        charts: ChartSet,
        report: String,
    ) -> Self {
        AnalysisOutput {
            variant: variant.name().to_string(),
            summaries: bundles.iter().map(|b| b.summary.clone()).collect(),
            comparisons,
            charts,
            report,
        }
    }
}

/// Every available analysis, in command-line order.
pub fn all() -> Vec<Box<dyn Analysis>> {
    vec![
        Box::new(basic::BasicAnalysis),
        Box::new(cpu::CpuAnalysis),
        Box::new(memory::MemoryAnalysis),
        Box::new(comprehensive::ComprehensiveAnalysis),
        Box::new(realistic::RealisticAnalysis),
        Box::new(resource::ResourceAnalysis),
        Box::new(performance::PerformanceAnalysis),
    ]
}

pub fn by_name(name: &str) -> Option<Box<dyn Analysis>> {
    all().into_iter().find(|a| a.name() == name)
}

pub fn names() -> Vec<&'static str> {
    all().iter().map(|a| a.name()).collect()
}

/// Checks the required columns, then runs the analysis.
pub fn run(analysis: &dyn Analysis, dataset: &Dataset, config: &AnalysisConfig) -> Result<AnalysisOutput> {
    dataset.require(analysis.required_columns())?;
    info!(
        "Running {} analysis on {} ({} iterations)",
        analysis.name(),
        dataset.path.display(),
        dataset.len()
    );
    analysis.analyze(dataset, config)
}

/// Writes the chart set of `output` to `image` (or the analysis default
/// inside the configured output directory) and returns the path written.
pub fn write_image(
    analysis: &dyn Analysis,
    output: &AnalysisOutput,
    config: &AnalysisConfig,
    image: Option<&Path>,
) -> Result<PathBuf> {
    let path = match image {
        Some(p) => p.to_path_buf(),
        None => config.output_path(analysis.image_name()),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AnalysisError::io(format!("creating {}", parent.display()), e))?;
    }
    draw_chart_set(&output.charts, &path, (config.image_width, config.image_height))?;
    Ok(path)
}

/// Serializes `value` as pretty JSON into `path`.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| AnalysisError::io(format!("writing {}", path.display()), e))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Loads `column` as a series and summarizes it.
pub(crate) fn summarized(
    dataset: &Dataset,
    column: &str,
    strategy: Option<Strategy>,
    metric: Metric,
) -> Result<SummarizedSeries> {
    let bundle = SummarizedSeries::new(dataset.series(column, strategy, metric)?)?;
    debug!("{}: {}", column, bundle.summary.mean_pm_std());
    Ok(bundle)
}

/// Compares the optional recorded `speedup_ratio` column with `computed`
/// and logs the iterations that disagree.
pub(crate) fn check_recorded_ratios(dataset: &Dataset, computed: &[f64]) -> Result<()> {
    if !dataset.has_column(columns::SPEEDUP_RATIO) {
        return Ok(());
    }
    let recorded = dataset.column(columns::SPEEDUP_RATIO)?;
    let divergent = divergent_ratios(recorded, computed, RATIO_TOLERANCE);
    if divergent.is_empty() {
        debug!("Recorded speedup ratios agree with the computed ones");
    } else {
        warn!(
            "Recorded speedup_ratio differs from the computed ratio by more than {:.0}% at iterations {:?}",
            RATIO_TOLERANCE * 100.0,
            divergent.iter().map(|i| i + 1).collect::<Vec<_>>()
        );
    }
    Ok(())
}

/// Percentage of `count` in `total`, zero for an empty total.
pub(crate) fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Charts and statistics shared by the single-resource analyses, which
/// profile one resource of the super query against its execution time.
pub(crate) struct ResourceProfile {
    pub correlation: Option<f64>,
    pub cv_percent: f64,
    pub table: String,
    pub panels: Vec<Panel>,
}

pub(crate) fn resource_profile(
    resource: &SummarizedSeries,
    time: &SummarizedSeries,
    x: &[f64],
    bins: usize,
    extra_rows: Vec<(String, String)>,
) -> Result<ResourceProfile> {
    let s = &resource.summary;
    let m = s.metric;
    let unit = m.unit();
    let cv_percent = s.cv()?;
    let correlation = statistics::pearson(&resource.series.values, &time.series.values);

    let mut rows = vec![
        ("Mean".to_string(), format!("{} {}", m.format(s.mean), unit)),
        ("Std Dev".to_string(), format!("{} {}", m.format(s.std), unit)),
        ("Min".to_string(), format!("{} {}", m.format(s.min), unit)),
        ("Max".to_string(), format!("{} {}", m.format(s.max), unit)),
        ("Median".to_string(), format!("{} {}", m.format(s.median), unit)),
        ("CV (%)".to_string(), format!("{}%", format_cv(s))),
        ("Range".to_string(), format!("{} {}", m.format(s.range), unit)),
        ("IQR".to_string(), format!("{} {}", m.format(s.iqr), unit)),
    ];
    rows.extend(extra_rows);

    let over_time = charts::with_mean_line(
        charts::time_series_panel(
            format!("{} Over Time (μ={}{})", m.name(), s.mean_pm_std(), unit),
            x,
            &[resource],
            Spread::Band,
        ),
        s,
    );
    let distribution = charts::histogram_panel(format!("{} Distribution", m.name()), resource, bins);
    let scatter_title = match correlation {
        Some(r) => format!("{} vs Execution Time (r={:.3})", m.name(), r),
        None => format!("{} vs Execution Time", m.name()),
    };
    let scatter = charts::scatter_panel(scatter_title, &resource.series, &time.series, true);
    let table = charts::table_panel(
        format!("{} Statistics", m.name()),
        vec!["Statistic".to_string(), "Value".to_string()],
        rows.iter().map(|(k, v)| vec![k.clone(), v.clone()]).collect(),
    );

    Ok(ResourceProfile {
        correlation,
        cv_percent,
        table: statistic_table(&rows),
        panels: vec![over_time, distribution, scatter, table],
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::full_dataset;
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(
            names(),
            vec!["basic", "cpu", "memory", "comprehensive", "realistic", "resource", "performance"]
        );
        assert_eq!(by_name("resource").unwrap().name(), "resource");
        assert!(by_name("nope").is_none());
    }

    #[test]
    fn test_every_analysis_runs_on_full_dataset() {
        let dataset = full_dataset();
        let config = AnalysisConfig::default();
        for analysis in all() {
            let output = run(analysis.as_ref(), &dataset, &config).unwrap();
            assert_eq!(output.variant, analysis.name());
            assert!(!output.charts.panels.is_empty(), "{} has no panels", analysis.name());
            assert!(
                output.report.contains(&analysis.title().to_uppercase()),
                "{} report lacks its banner",
                analysis.name()
            );
            assert!(!output.report.contains("NaN"), "{} report has NaN", analysis.name());
        }
    }

    #[test]
    fn test_missing_column_is_reported_before_analysis() {
        let dataset = Dataset::from_columns("small.csv", vec![(columns::ITERATION, vec![1.0, 2.0])]).unwrap();
        let err = run(&performance::PerformanceAnalysis, &dataset, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn { .. }));
    }

    #[test]
    fn test_recorded_ratio_check_tolerates_matching_columns() {
        let dataset = Dataset::from_columns(
            "r.csv",
            vec![(columns::SPEEDUP_RATIO, vec![2.0, 2.0])],
        )
        .unwrap();
        assert!(check_recorded_ratios(&dataset, &[2.0, 2.5]).is_ok());
        assert!(check_recorded_ratios(&full_dataset(), &[1.0]).is_ok());
    }

    #[test]
    fn test_write_image_and_json() {
        let dataset = full_dataset();
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig {
            output_dir: dir.path().to_path_buf(),
            ..AnalysisConfig::default()
        };
        let analysis = performance::PerformanceAnalysis;
        let output = run(&analysis, &dataset, &config).unwrap();

        let image = write_image(&analysis, &output, &config, None).unwrap();
        assert_eq!(image, dir.path().join(analysis.image_name()));
        assert!(image.exists());

        let json = dir.path().join("out.json");
        write_json(&output, &json).unwrap();
        let text = std::fs::read_to_string(json).unwrap();
        assert!(text.contains("\"variant\": \"performance\""));
    }

    #[test]
    fn test_share() {
        assert_eq!(share(0, 0), 0.0);
        assert_eq!(share(3, 4), 75.0);
    }
}
