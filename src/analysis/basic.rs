use crate::analysis::{check_recorded_ratios, summarized, Analysis, AnalysisOutput};
use crate::charts::{self, ChartSet, LineStyle, ReferenceLine, Spread};
use crate::comparison::{relative_improvement, speedup_ratios};
use crate::config::AnalysisConfig;
use crate::dataset::{columns, Dataset, Metric, Series, Strategy};
use crate::error::Result;
use crate::report::{render_report, Report, ReportSection};
use crate::statistics::SummarizedSeries;

/// First-generation layout: super query against parallel subqueries, with
/// resource readings for the super query only.
pub struct BasicAnalysis;

impl Analysis for BasicAnalysis {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn title(&self) -> &'static str {
        "Performance statistics"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[
            columns::ITERATION,
            columns::SUPER_TIME,
            columns::PARALLEL_TOTAL_TIME,
            columns::PARALLEL_QUERY_TIME,
            columns::SUPER_MEMORY,
            columns::SUPER_CPU,
        ]
    }

    fn image_name(&self) -> &'static str {
        "performance_comparison.svg"
    }

    fn analyze(&self, dataset: &Dataset, _config: &AnalysisConfig) -> Result<AnalysisOutput> {
        let x = dataset.iterations()?;

        let super_time = summarized(dataset, columns::SUPER_TIME, Some(Strategy::SuperQuery), Metric::ExecutionTime)?;
        let parallel_total = summarized(
            dataset,
            columns::PARALLEL_TOTAL_TIME,
            Some(Strategy::ParallelJoin),
            Metric::ExecutionTime,
        )?;
        // No strategy: the legend must tell it apart from the total time line.
        let parallel_query = summarized(dataset, columns::PARALLEL_QUERY_TIME, None, Metric::QueryTime)?;
        let memory = summarized(dataset, columns::SUPER_MEMORY, Some(Strategy::SuperQuery), Metric::Memory)?;
        let cpu = summarized(dataset, columns::SUPER_CPU, Some(Strategy::SuperQuery), Metric::CpuTime)?;

        // Improvement of the parallel approach, relative to the super query
        let improvement = SummarizedSeries::new(Series::new(
            "improvement",
            None,
            Metric::Percent,
            relative_improvement(&super_time.series, &parallel_total.series)?,
        ))?;

        let ratios = SummarizedSeries::new(Series::new(
            format!("{} / {}", columns::SUPER_TIME, columns::PARALLEL_TOTAL_TIME),
            None,
            Metric::Ratio,
            speedup_ratios(&super_time.series, &parallel_total.series)?,
        ))?;
        check_recorded_ratios(dataset, &ratios.series.values)?;

        let panels = vec![
            charts::time_series_panel(
                "Execution Time Comparison",
                &x,
                &[&super_time, &parallel_total, &parallel_query],
                Spread::None,
            ),
            charts::bar_panel(
                "Memory Usage (Super Query Only)",
                &x,
                &[&memory.series],
                Metric::Memory.axis_label(),
            ),
            charts::time_series_panel("CPU Usage (Super Query)", &x, &[&cpu], Spread::None),
            charts::with_reference(
                charts::bar_panel(
                    "Parallel Approach Performance Improvement",
                    &x,
                    &[&improvement.series],
                    Metric::Percent.axis_label(),
                ),
                ReferenceLine::horizontal("No change", 0.0, LineStyle::Solid),
            ),
        ];
        let chart_set = ChartSet::grid("Super Query vs Parallel Subqueries", 2, panels);

        let bundles = vec![super_time, parallel_total, parallel_query, memory, cpu];

        let mut report = Report::new(self.title());
        report.section(
            ReportSection::new("Averages")
                .line(format!("Super Query Time: {}ms", bundles[0].summary.mean_pm_std()))
                .line(format!("Parallel Total Time: {}ms", bundles[1].summary.mean_pm_std()))
                .line(format!("Performance Improvement: {}%", improvement.summary.mean_pm_std()))
                .line(format!("Memory Usage: {}MB", bundles[3].summary.mean_pm_std()))
                .line(format!("CPU Usage: {}ms", bundles[4].summary.mean_pm_std())),
        );
        report.section(
            ReportSection::new("Speed")
                .line(format!("Parallel approach is {:.1}x faster on average", ratios.summary.mean)),
        );
        report.block(render_report(&bundles, &[]));

        Ok(AnalysisOutput::new(self, &bundles, Vec::new(), chart_set, report.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::full_dataset;
    use crate::analysis::run;
    use crate::charts::PanelKind;

    #[test]
    fn test_basic_report() {
        let output = run(&BasicAnalysis, &full_dataset(), &AnalysisConfig::default()).unwrap();

        // Parallel total time is about half the super query time
        assert!(output.report.contains("Performance Improvement: 50.0 ± "));
        assert!(output.report.contains("Parallel approach is 2.0x faster on average"));
        assert!(output.report.contains("Super Query Time: 100.00 ± "));
        assert_eq!(output.summaries.len(), 5);
        assert!(output.comparisons.is_empty());
    }

    #[test]
    fn test_basic_panels() {
        let output = run(&BasicAnalysis, &full_dataset(), &AnalysisConfig::default()).unwrap();
        assert_eq!((output.charts.rows, output.charts.cols), (2, 2));

        match &output.charts.panels[0].kind {
            PanelKind::TimeSeries { lines, .. } => {
                assert_eq!(lines.len(), 3);
                assert!(lines[2].label.starts_with("parallel_query_time"));
            }
            other => panic!("unexpected panel: {other:?}"),
        }
        match &output.charts.panels[3].kind {
            PanelKind::Bars { groups, references } => {
                assert_eq!(groups[0].points[0], (1.0, 50.0));
                assert_eq!(references[0].value, 0.0);
            }
            other => panic!("unexpected panel: {other:?}"),
        }
    }

    #[test]
    fn test_zero_parallel_time_aborts() {
        let dataset = Dataset::from_columns(
            "zero.csv",
            vec![
                (columns::ITERATION, vec![1.0, 2.0]),
                (columns::SUPER_TIME, vec![10.0, 12.0]),
                (columns::PARALLEL_TOTAL_TIME, vec![5.0, 0.0]),
                (columns::PARALLEL_QUERY_TIME, vec![4.0, 0.0]),
                (columns::SUPER_MEMORY, vec![1.0, 1.0]),
                (columns::SUPER_CPU, vec![3.0, 4.0]),
            ],
        )
        .unwrap();

        // the improvement divides by super_time, the ratio by parallel_total_time
        let err = run(&BasicAnalysis, &dataset, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::DivideByZero { index: 1, .. }));
    }
}
