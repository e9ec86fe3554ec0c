use crate::analysis::{check_recorded_ratios, share, summarized, Analysis, AnalysisOutput};
use crate::charts::{self, ChartSet, Spread};
use crate::comparison::{compare, WinConvention};
use crate::config::AnalysisConfig;
use crate::dataset::{columns, Dataset, Metric, Strategy};
use crate::error::Result;
use crate::report::{format_cv, format_p_value, Report, ReportSection, Variability};

/// Execution time of the super query against parallel+join, with the
/// parallel approach credited for every iteration where it was faster.
pub struct PerformanceAnalysis;

impl Analysis for PerformanceAnalysis {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn title(&self) -> &'static str {
        "Comprehensive performance comparison"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[columns::ITERATION, columns::SUPER_TIME, columns::PAR_TOTAL_TIME]
    }

    fn image_name(&self) -> &'static str {
        "performance_comparison_detailed.svg"
    }

    fn analyze(&self, dataset: &Dataset, _config: &AnalysisConfig) -> Result<AnalysisOutput> {
        let x = dataset.iterations()?;
        let super_time = summarized(dataset, columns::SUPER_TIME, Some(Strategy::SuperQuery), Metric::ExecutionTime)?;
        let par_time = summarized(dataset, columns::PAR_TOTAL_TIME, Some(Strategy::ParallelJoin), Metric::ExecutionTime)?;

        let comparison = compare(&super_time.series, &par_time.series)?;
        check_recorded_ratios(dataset, &comparison.ratios)?;

        let super_cv = super_time.summary.cv()?;
        let par_cv = par_time.summary.cv()?;

        let stats_rows = {
            let (a, b) = (&super_time.summary, &par_time.summary);
            let m = Metric::ExecutionTime;
            let ratio = &comparison.ratio_summary;
            vec![
                vec!["Mean (ms)".to_string(), m.format(a.mean), m.format(b.mean), m.format(a.mean - b.mean)],
                vec!["Std Dev (ms)".to_string(), m.format(a.std), m.format(b.std), m.format((a.std - b.std).abs())],
                vec!["Min (ms)".to_string(), m.format(a.min), m.format(b.min), m.format(a.min - b.min)],
                vec!["Max (ms)".to_string(), m.format(a.max), m.format(b.max), m.format(a.max - b.max)],
                vec!["Median (ms)".to_string(), m.format(a.median), m.format(b.median), m.format(a.median - b.median)],
                vec!["CV (%)".to_string(), format_cv(a), format_cv(b), "-".to_string()],
                vec![
                    "Speedup".to_string(),
                    "-".to_string(),
                    format!("{:.2}x", ratio.mean),
                    format!("±{:.2}x", ratio.std),
                ],
                vec![
                    "p-value".to_string(),
                    format_p_value(comparison.p_value),
                    if comparison.significant { "Significant" } else { "Not Sig." }.to_string(),
                    "-".to_string(),
                ],
                vec![
                    "Effect Size".to_string(),
                    format!("{:.2}", comparison.cohens_d.abs()),
                    comparison.effect_size.label().to_string(),
                    "-".to_string(),
                ],
            ]
        };

        let panels = vec![
            charts::time_series_panel(
                "Execution Time Comparison",
                &x,
                &[&super_time, &par_time],
                Spread::ErrorBars,
            ),
            charts::box_plot_panel("Execution Time Distribution", &[&super_time, &par_time]),
            charts::ratio_panel("Parallel Speedup per Iteration", &x, &comparison),
            charts::table_panel(
                "Performance Statistics",
                vec![
                    "Metric".to_string(),
                    Strategy::SuperQuery.to_string(),
                    Strategy::ParallelJoin.to_string(),
                    "Difference".to_string(),
                ],
                stats_rows,
            ),
        ];
        let chart_set = ChartSet::grid("Super Query vs Parallel+Join Performance", 2, panels);

        let (_, parallel_wins) = comparison.tally.credited(WinConvention::DenominatorWins);
        let total = comparison.tally.total();
        let gain = comparison.ratio_summary.mean;

        let mut report = Report::new(self.title());
        report.section(
            ReportSection::new("Execution Time Analysis")
                .line(format!(
                    "Super Query:    {:.1}ms ± {:.1}ms",
                    super_time.summary.mean, super_time.summary.std
                ))
                .line(format!(
                    "Parallel+Join:  {:.1}ms ± {:.1}ms",
                    par_time.summary.mean, par_time.summary.std
                ))
                .line(format!("Performance Gain: {:.1}x faster with parallel approach", gain)),
        );
        report.section(
            ReportSection::new("Statistical Significance")
                .line(format!("t-statistic: {:.2}", comparison.t_statistic))
                .line(format!("p-value: {}", format_p_value(comparison.p_value)))
                .line(format!("Result: {}", comparison.significance_wording()))
                .line(format!(
                    "Effect size: {:.2} ({} effect)",
                    comparison.cohens_d.abs(),
                    comparison.effect_size.label()
                )),
        );
        report.section(
            ReportSection::new("Consistency Analysis")
                .line(format!(
                    "Super Query CV: {:.1}% ({} variability)",
                    super_cv,
                    Variability::classify(super_cv).label()
                ))
                .line(format!(
                    "Parallel CV: {:.1}% ({} variability)",
                    par_cv,
                    Variability::classify(par_cv).label()
                )),
        );
        report.section(
            ReportSection::new("Winner Analysis")
                .line(format!(
                    "Parallel wins: {}/{} runs ({:.0}%)",
                    parallel_wins,
                    total,
                    share(parallel_wins, total)
                ))
                .line(format!("Average advantage: {:.1}x faster", gain)),
        );

        Ok(AnalysisOutput::new(
            self,
            &[super_time, par_time],
            vec![comparison],
            chart_set,
            report.render(),
        ))
    }
}
