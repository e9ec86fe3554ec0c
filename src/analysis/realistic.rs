use crate::analysis::{check_recorded_ratios, summarized, Analysis, AnalysisOutput};
use crate::charts::{self, ChartSet, Line, LineStyle, Panel, PanelKind, ReferenceLine, Spread};
use crate::comparison::{compare, share_percent, Comparison};
use crate::config::AnalysisConfig;
use crate::dataset::{columns, Dataset, Metric, Series, Strategy};
use crate::error::Result;
use crate::report::{render_report, Report, ReportSection};
use crate::statistics::SummarizedSeries;

/// Cache-cleared runs comparing all three strategies, with the combination
/// step of the sequential and parallel strategies timed separately.
pub struct RealisticAnalysis;

impl Analysis for RealisticAnalysis {
    fn name(&self) -> &'static str {
        "realistic"
    }

    fn title(&self) -> &'static str {
        "Detailed performance analysis"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[
            columns::ITERATION,
            columns::SUPER_TIME,
            columns::SEQ_TOTAL_TIME,
            columns::SEQ_FINAL_TIME,
            columns::SEQ_COMBINATION_TIME,
            columns::PAR_TOTAL_TIME,
            columns::PAR_QUERY_TIME,
            columns::PAR_COMBINATION_TIME,
            columns::SUPER_MEMORY,
        ]
    }

    fn image_name(&self) -> &'static str {
        "performance_detailed.svg"
    }

    fn analyze(&self, dataset: &Dataset, _config: &AnalysisConfig) -> Result<AnalysisOutput> {
        let x = dataset.iterations()?;

        let super_time = summarized(dataset, columns::SUPER_TIME, Some(Strategy::SuperQuery), Metric::ExecutionTime)?;
        let seq_final = summarized(dataset, columns::SEQ_FINAL_TIME, Some(Strategy::Sequential), Metric::ExecutionTime)?;
        let par_total = summarized(dataset, columns::PAR_TOTAL_TIME, Some(Strategy::ParallelJoin), Metric::ExecutionTime)?;
        let seq_queries = summarized(dataset, columns::SEQ_TOTAL_TIME, Some(Strategy::Sequential), Metric::QueryTime)?;
        let par_queries = summarized(dataset, columns::PAR_QUERY_TIME, Some(Strategy::ParallelJoin), Metric::QueryTime)?;
        let seq_combination = summarized(
            dataset,
            columns::SEQ_COMBINATION_TIME,
            Some(Strategy::Sequential),
            Metric::CombinationTime,
        )?;
        let par_combination = summarized(
            dataset,
            columns::PAR_COMBINATION_TIME,
            Some(Strategy::ParallelJoin),
            Metric::CombinationTime,
        )?;
        let memory = summarized(dataset, columns::SUPER_MEMORY, Some(Strategy::SuperQuery), Metric::Memory)?;

        // Speedups of each strategy over the super query, then parallel over sequential
        let super_vs_seq = compare(&super_time.series, &seq_final.series)?;
        let super_vs_par = compare(&super_time.series, &par_total.series)?;
        let seq_vs_par = compare(&seq_final.series, &par_total.series)?;
        check_recorded_ratios(dataset, &super_vs_par.ratios)?;

        // Share of the final time spent combining subquery results
        let seq_overhead = overhead(&seq_combination.series, &seq_final.series)?;
        let par_overhead = overhead(&par_combination.series, &par_total.series)?;

        let panels = vec![
            charts::time_series_panel(
                "Total Execution Time Comparison",
                &x,
                &[&super_time, &seq_final, &par_total],
                Spread::None,
            ),
            charts::bar_panel(
                "Query Execution Time Only (No Combination)",
                &x,
                &[&super_time.series, &seq_queries.series, &par_queries.series],
                Metric::QueryTime.axis_label(),
            ),
            charts::bar_panel(
                "Memory Usage (Super Query)",
                &x,
                &[&memory.series],
                Metric::Memory.axis_label(),
            ),
            ratio_lines_panel(&x, &[("Super vs Sequential", &super_vs_seq), ("Super vs Parallel", &super_vs_par)]),
        ];
        let chart_set = ChartSet::grid("Super Query vs Sequential vs Parallel (Cache-Cleared)", 2, panels);

        let mut report = Report::new(self.title());
        report.section(
            ReportSection::new("Totals")
                .line(format!("Super Query Average: {}ms", super_time.summary.mean_pm_std()))
                .line(format!("Sequential Total Average: {}ms", seq_final.summary.mean_pm_std()))
                .line(format!("Parallel Total Average: {}ms", par_total.summary.mean_pm_std())),
        );
        report.section(
            ReportSection::new("Queries only")
                .line(format!("Sequential Queries Only: {}ms", seq_queries.summary.mean_pm_std()))
                .line(format!("Parallel Queries Only: {}ms", par_queries.summary.mean_pm_std())),
        );
        report.section(
            ReportSection::new("Speedups")
                .line(format!("Sequential Speedup vs Super: {:.2}x", super_vs_seq.ratio_summary.mean))
                .line(format!("Parallel Speedup vs Super: {:.2}x", super_vs_par.ratio_summary.mean))
                .line(format!("Parallel vs Sequential Speedup: {:.2}x", seq_vs_par.ratio_summary.mean)),
        );
        report.section(
            ReportSection::new("Overhead analysis")
                .line(format!(
                    "Sequential Combination Overhead: {}%",
                    seq_overhead.summary.mean_pm_std()
                ))
                .line(format!(
                    "Parallel Combination Overhead: {}%",
                    par_overhead.summary.mean_pm_std()
                )),
        );

        let bundles = vec![
            super_time,
            seq_final,
            par_total,
            seq_queries,
            par_queries,
            seq_combination,
            par_combination,
            memory,
            seq_overhead,
            par_overhead,
        ];
        let comparisons = vec![super_vs_seq, super_vs_par, seq_vs_par];
        report.block(render_report(&bundles, &comparisons));

        Ok(AnalysisOutput::new(self, &bundles, comparisons, chart_set, report.render()))
    }
}

fn overhead(combination: &Series, total: &Series) -> Result<SummarizedSeries> {
    SummarizedSeries::new(Series::new(
        format!("{} / {}", combination.label, total.label),
        combination.strategy,
        Metric::Percent,
        share_percent(combination, total)?,
    ))
}

/// Several speedup ratios on one panel, with the equal-performance line.
fn ratio_lines_panel(x: &[f64], ratios: &[(&str, &Comparison)]) -> Panel {
    let lines = ratios
        .iter()
        .map(|(label, c)| Line {
            label: label.to_string(),
            points: x.iter().copied().zip(c.ratios.iter().copied()).collect(),
            error: None,
        })
        .collect();

    Panel {
        title: "Performance Ratios (>1 means approach is faster)".to_string(),
        x_label: "Iteration".to_string(),
        y_label: "Speed Ratio (Super Time / Approach Time)".to_string(),
        kind: PanelKind::TimeSeries {
            lines,
            bands: Vec::new(),
            references: vec![ReferenceLine::horizontal("Equal Performance", 1.0, LineStyle::Dashed)],
        },
    }
}
