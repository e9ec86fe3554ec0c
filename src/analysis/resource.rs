use crate::analysis::{check_recorded_ratios, summarized, Analysis, AnalysisOutput};
use crate::charts::{self, Band, ChartSet, Line, PanelKind, Spread};
use crate::comparison::{compare, mean_ratio, percent_reduction, Comparison};
use crate::config::AnalysisConfig;
use crate::dataset::{columns, Dataset, Metric, Strategy};
use crate::error::Result;
use crate::report::{format_correlation, format_p_value, Report, ReportSection};
use crate::statistics::{
    checked_ratio, filter_outliers_below_percentile, indices_at_or_above_percentile, pearson, SummarizedSeries,
};

/// Normalized efficiency of the parallel approach relative to the super
/// query, one value per radar axis. Higher is better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Efficiency {
    pub time: f64,
    pub memory: f64,
    pub cpu: f64,
}

impl Efficiency {
    /// `1 - parallel / super` for time and CPU. Memory uses absolute means
    /// clamped to `[0, 1]`, since memory deltas can be negative.
    pub fn compute(
        super_time: &SummarizedSeries,
        par_time: &SummarizedSeries,
        super_memory: &SummarizedSeries,
        par_memory: &SummarizedSeries,
        super_cpu: &SummarizedSeries,
        par_cpu: &SummarizedSeries,
    ) -> Result<Self> {
        let time = 1.0 - mean_ratio(&par_time.summary, &super_time.summary)?;
        let memory = (1.0
            - checked_ratio(
                par_memory.summary.mean.abs(),
                super_memory.summary.mean.abs(),
                &format!("mean of {}", super_memory.series.label),
            )?)
        .clamp(0.0, 1.0);
        let cpu = 1.0 - mean_ratio(&par_cpu.summary, &super_cpu.summary)?;
        Ok(Efficiency { time, memory, cpu })
    }

    pub fn values(&self) -> [f64; 3] {
        [self.time, self.memory, self.cpu]
    }
}

/// Latency, memory and CPU of both strategies side by side.
pub struct ResourceAnalysis;

impl Analysis for ResourceAnalysis {
    fn name(&self) -> &'static str {
        "resource"
    }

    fn title(&self) -> &'static str {
        "Comprehensive resource usage analysis"
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
        "resource_comparison.svg"
    }

    fn analyze(&self, dataset: &Dataset, config: &AnalysisConfig) -> Result<AnalysisOutput> {
        let x = dataset.iterations()?;

        let super_time = summarized(dataset, columns::SUPER_TIME, Some(Strategy::SuperQuery), Metric::ExecutionTime)?;
        let par_time = summarized(dataset, columns::PAR_TOTAL_TIME, Some(Strategy::ParallelJoin), Metric::ExecutionTime)?;
        let super_memory = summarized(dataset, columns::SUPER_MEMORY, Some(Strategy::SuperQuery), Metric::Memory)?;
        let par_memory = summarized(dataset, columns::PAR_MEMORY, Some(Strategy::ParallelJoin), Metric::Memory)?;
        let super_cpu = summarized(dataset, columns::SUPER_CPU, Some(Strategy::SuperQuery), Metric::CpuTime)?;
        let par_cpu = summarized(dataset, columns::PAR_CPU, Some(Strategy::ParallelJoin), Metric::CpuTime)?;

        // Parallel memory readings carry large negative deltas from collections
        // during fast runs; drop the lowest ones before comparing means.
        let percentile = config.outlier_percentile;
        let mut filtered = filter_outliers_below_percentile(&par_memory.series, percentile)?;
        filtered.label = format!("{} (filtered)", filtered.label);
        let par_memory_filtered = SummarizedSeries::new(filtered)?;
        let kept = indices_at_or_above_percentile(&par_memory.series.values, percentile);

        let time_comparison = compare(&super_time.series, &par_time.series)?;
        let cpu_comparison = compare(&super_cpu.series, &par_cpu.series)?;
        check_recorded_ratios(dataset, &time_comparison.ratios)?;

        let speedup = mean_ratio(&super_time.summary, &par_time.summary)?;
        let memory_reduction = percent_reduction(
            super_memory.summary.mean,
            par_memory_filtered.summary.mean.abs(),
            &format!("mean of {}", super_memory.series.label),
        )?;
        let cpu_reduction = percent_reduction(
            super_cpu.summary.mean,
            par_cpu.summary.mean,
            &format!("mean of {}", super_cpu.series.label),
        )?;
        let efficiency = Efficiency::compute(&super_time, &par_time, &super_memory, &par_memory, &super_cpu, &par_cpu)?;

        let super_correlation = pearson(&super_time.series.values, &super_memory.series.values);
        let par_correlation = pearson(&par_time.series.values, &par_memory.series.values);

        // Memory panel: the parallel line only covers the iterations that survived the filter
        let mut memory_panel = charts::time_series_panel(
            "Memory Usage Comparison",
            &x,
            &[&super_memory],
            Spread::Band,
        );
        if let PanelKind::TimeSeries { lines, bands, .. } = &mut memory_panel.kind {
            lines.push(Line {
                label: format!(
                    "{} (filtered, μ={}MB)",
                    Strategy::ParallelJoin,
                    Metric::Memory.format(par_memory_filtered.summary.mean)
                ),
                points: kept.iter().map(|&i| (x[i], par_memory.series.values[i])).collect(),
                error: None,
            });
            let filtered = &par_memory_filtered.summary;
            bands.push(Band {
                label: format!("{} (filtered) ±1σ", Strategy::ParallelJoin),
                lower: filtered.mean - filtered.std,
                upper: filtered.mean + filtered.std,
            });
        }

        let panels = vec![
            charts::time_series_panel("Latency Comparison", &x, &[&super_time, &par_time], Spread::Band),
            memory_panel,
            charts::time_series_panel("CPU Usage Comparison", &x, &[&super_cpu, &par_cpu], Spread::Band),
            charts::radar_panel(
                "Resource Efficiency",
                format!("{} vs {}", Strategy::ParallelJoin, Strategy::SuperQuery),
                &["Latency", "Memory", "CPU"],
                &efficiency.values(),
            ),
            charts::multi_scatter_panel(
                format!(
                    "Resource Correlation ({} {} | {} {})",
                    Strategy::SuperQuery,
                    format_correlation(super_correlation),
                    Strategy::ParallelJoin,
                    format_correlation(par_correlation)
                ),
                &[
                    (&super_time.series, &super_memory.series),
                    (&par_time.series, &par_memory.series),
                ],
            ),
            charts::table_panel(
                "Resource Summary",
                ["Metric", "Super Query", "Parallel+Join", "Change"]
                    .iter()
                    .map(|h| h.to_string())
                    .collect(),
                vec![
                    vec![
                        "Latency (ms)".to_string(),
                        Metric::ExecutionTime.format(super_time.summary.mean),
                        Metric::ExecutionTime.format(par_time.summary.mean),
                        format!("{:.2}x faster", speedup),
                    ],
                    vec![
                        "Memory (MB)".to_string(),
                        Metric::Memory.format(super_memory.summary.mean),
                        format!("{}*", Metric::Memory.format(par_memory_filtered.summary.mean)),
                        format!("{:.1}% less", memory_reduction),
                    ],
                    vec![
                        "CPU (ms)".to_string(),
                        Metric::CpuTime.format(super_cpu.summary.mean),
                        Metric::CpuTime.format(par_cpu.summary.mean),
                        format!("{:.1}% less", cpu_reduction),
                    ],
                ],
            ),
        ];
        let chart_set = ChartSet::grid("Resource Usage: Super Query vs Parallel+Join", 3, panels);

        let mut report = Report::new(self.title());
        report.section(ReportSection::new("Runs").line(format!("Analyzed {} experimental runs", dataset.len())));
        report.section(
            ReportSection::new("Resource usage statistics")
                .line(format!(
                    "Latency: Super Query {}ms vs Parallel {}ms",
                    Metric::ExecutionTime.format(super_time.summary.mean),
                    Metric::ExecutionTime.format(par_time.summary.mean)
                ))
                .line(format!("         Speedup: {:.2}x faster", speedup))
                .line(format!(
                    "Memory:  Super Query {}MB vs Parallel {}MB (filtered)",
                    Metric::Memory.format(super_memory.summary.mean),
                    Metric::Memory.format(par_memory_filtered.summary.mean)
                ))
                .line(format!("         Reduction: {:.1}%", memory_reduction))
                .line(format!(
                    "CPU:     Super Query {}ms vs Parallel {}ms",
                    Metric::ExecutionTime.format(super_cpu.summary.mean),
                    Metric::ExecutionTime.format(par_cpu.summary.mean)
                ))
                .line(format!("         Reduction: {:.1}%", cpu_reduction)),
        );
        report.section(
            ReportSection::new("Time vs memory correlation")
                .line(format!("Super Query:   {}", format_correlation(super_correlation)))
                .line(format!("Parallel+Join: {}", format_correlation(par_correlation))),
        );
        report.section(
            ReportSection::new("Statistical significance")
                .line(significance_line("Latency: ", &time_comparison))
                .line(significance_line("CPU:     ", &cpu_comparison)),
        );
        report.section(
            ReportSection::new("Notes")
                .line(format!(
                    "* Parallel memory values below the {:.0}th percentile were filtered as extreme negative outliers",
                    percentile * 100.0
                ))
                .line("  (likely garbage collection artifacts during fast execution)"),
        );

        let bundles = vec![
            super_time,
            par_time,
            super_memory,
            par_memory,
            par_memory_filtered,
            super_cpu,
            par_cpu,
        ];
        Ok(AnalysisOutput::new(
            self,
            &bundles,
            vec![time_comparison, cpu_comparison],
            chart_set,
            report.render(),
        ))
    }
}

fn significance_line(prefix: &str, c: &Comparison) -> String {
    format!(
        "{}t={:.2}, p={} {}",
        prefix,
        c.t_statistic,
        format_p_value(c.p_value),
        if c.significant { "(significant)" } else { "(not significant)" }
    )
}
