use crate::analysis::{check_recorded_ratios, share, summarized, Analysis, AnalysisOutput};
use crate::charts::{self, ChartSet, Spread};
use crate::comparison::{compare, WinConvention};
use crate::config::AnalysisConfig;
use crate::dataset::{columns, Dataset, Metric, Strategy};
use crate::error::Result;
use crate::report::{render_report, Report, ReportSection};
use crate::statistics::{pearson, SummarizedSeries};

/// Full statistical comparison of super query and parallel+join execution
/// time, with memory and CPU readings for both.
pub struct ComprehensiveAnalysis;

impl Analysis for ComprehensiveAnalysis {
    fn name(&self) -> &'static str {
        "comprehensive"
    }

    fn title(&self) -> &'static str {
        "Comprehensive statistical analysis"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[
            columns::ITERATION,
            columns::SUPER_TIME,
            columns::PAR_TOTAL_TIME,
            columns::SUPER_MEMORY,
            columns::PAR_MEMORY,
            columns::SUPER_CPU,
            columns::PAR_CPU,
        ]
    }

    fn image_name(&self) -> &'static str {
        "comprehensive_performance_analysis.svg"
    }

    fn analyze(&self, dataset: &Dataset, config: &AnalysisConfig) -> Result<AnalysisOutput> {
        let x = dataset.iterations()?;

        let super_time = summarized(dataset, columns::SUPER_TIME, Some(Strategy::SuperQuery), Metric::ExecutionTime)?;
        let par_time = summarized(dataset, columns::PAR_TOTAL_TIME, Some(Strategy::ParallelJoin), Metric::ExecutionTime)?;
        let super_memory = summarized(dataset, columns::SUPER_MEMORY, Some(Strategy::SuperQuery), Metric::Memory)?;
        let par_memory = summarized(dataset, columns::PAR_MEMORY, Some(Strategy::ParallelJoin), Metric::Memory)?;
        let super_cpu = summarized(dataset, columns::SUPER_CPU, Some(Strategy::SuperQuery), Metric::CpuTime)?;
        let par_cpu = summarized(dataset, columns::PAR_CPU, Some(Strategy::ParallelJoin), Metric::CpuTime)?;

        let comparison = compare(&super_time.series, &par_time.series)?;
        check_recorded_ratios(dataset, &comparison.ratios)?;

        let ratios = SummarizedSeries {
            series: comparison.ratio_series(),
            summary: comparison.ratio_summary.clone(),
        };
        let correlation_title = match pearson(&super_time.series.values, &par_time.series.values) {
            Some(r) => format!("Execution Time Correlation (r={:.3})", r),
            None => "Execution Time Correlation".to_string(),
        };

        let mut panels = vec![
            charts::time_series_panel("Execution Time Comparison", &x, &[&super_time, &par_time], Spread::ErrorBars),
            charts::box_plot_panel("Execution Time Distribution", &[&super_time, &par_time]),
            charts::ratio_panel("Speedup Ratio per Iteration", &x, &comparison),
            charts::histogram_panel("Speedup Ratio Distribution", &ratios, config.ratio_bins),
            charts::time_series_panel("Memory Usage Comparison", &x, &[&super_memory, &par_memory], Spread::Band),
            charts::time_series_panel("CPU Usage Comparison", &x, &[&super_cpu, &par_cpu], Spread::Band),
            charts::scatter_panel(correlation_title, &super_time.series, &par_time.series, true),
        ];

        let bundles = vec![super_time, par_time, super_memory, par_memory, super_cpu, par_cpu];
        panels.push(charts::summary_table_panel(&bundles));
        let chart_set = ChartSet::grid("Super Query vs Parallel+Join: Comprehensive Analysis", 3, panels);

        let (super_wins, parallel_wins) = comparison.tally.credited(WinConvention::NumeratorWins);
        let total = comparison.tally.total();

        let mut report = Report::new(self.title());
        report.block(render_report(&bundles, std::slice::from_ref(&comparison)));
        report.section(
            ReportSection::new("Winner analysis")
                .line(format!(
                    "Super Query wins: {}/{} ({:.1}%)",
                    super_wins,
                    total,
                    share(super_wins, total)
                ))
                .line(format!(
                    "Parallel wins: {}/{} ({:.1}%)",
                    parallel_wins,
                    total,
                    share(parallel_wins, total)
                )),
        );

        Ok(AnalysisOutput::new(self, &bundles, vec![comparison], chart_set, report.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::full_dataset;
    use crate::analysis::run;
    use crate::charts::PanelKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_comprehensive_statistics() {
        let output = run(&ComprehensiveAnalysis, &full_dataset(), &AnalysisConfig::default()).unwrap();
        let comparison = &output.comparisons[0];

        assert!(comparison.significant);
        assert!(comparison.p_value < 0.001);
        assert_eq!(comparison.effect_size.label(), "Large");
        assert!((comparison.mean_difference - 50.0).abs() < 1e-9);
        assert_eq!(output.summaries.len(), 6);
    }

    #[test]
    fn test_super_query_is_credited_for_ratios_above_one() {
        let output = run(&ComprehensiveAnalysis, &full_dataset(), &AnalysisConfig::default()).unwrap();
        assert!(output.report.contains("Super Query wins: 10/10 (100.0%)"));
        assert!(output.report.contains("Parallel wins: 0/10 (0.0%)"));
    }

    #[test]
    fn test_comprehensive_layout() {
        let output = run(&ComprehensiveAnalysis, &full_dataset(), &AnalysisConfig::default()).unwrap();
        let charts = &output.charts;
        assert_eq!(charts.panels.len(), 8);
        assert_eq!((charts.rows, charts.cols), (3, 3));

        match &charts.panels[0].kind {
            PanelKind::TimeSeries { lines, .. } => assert!(lines.iter().all(|l| l.error.is_some())),
            other => panic!("unexpected panel: {other:?}"),
        }
        match &charts.panels[3].kind {
            PanelKind::Histogram { bins, .. } => assert_eq!(bins.len(), 10),
            other => panic!("unexpected panel: {other:?}"),
        }
        assert!(charts.panels[6].title.starts_with("Execution Time Correlation (r="));

        // Memory and CPU carry a mean ±1σ band per strategy
        for (panel, bundle) in [(4, 2), (5, 4)] {
            match &charts.panels[panel].kind {
                PanelKind::TimeSeries { bands, .. } => {
                    assert_eq!(bands.len(), 2);
                    let s = &output.summaries[bundle];
                    assert_relative_eq!(bands[0].lower, s.mean - s.std);
                    assert_relative_eq!(bands[0].upper, s.mean + s.std);
                }
                other => panic!("unexpected panel: {other:?}"),
            }
        }
    }
}
