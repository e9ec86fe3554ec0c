use crate::analysis::{resource_profile, summarized, Analysis, AnalysisOutput};
use crate::charts::ChartSet;
use crate::config::AnalysisConfig;
use crate::dataset::{columns, Dataset, Metric, Strategy};
use crate::error::Result;
use crate::report::{describe_correlation, format_correlation, Report, ReportSection, Variability};
use crate::statistics::checked_ratio;

const STRONG_CORRELATION: f64 = 0.7;
const MODERATE_CORRELATION: f64 = 0.5;

/// How much of the CPU time shows up as wall-clock execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuEfficiency {
    High,
    Moderate,
    Low,
}

impl CpuEfficiency {
    pub fn classify(efficiency_percent: f64) -> Self {
        if efficiency_percent > 80.0 {
            CpuEfficiency::High
        } else if efficiency_percent > 60.0 {
            CpuEfficiency::Moderate
        } else {
            CpuEfficiency::Low
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CpuEfficiency::High => "Highly efficient CPU usage",
            CpuEfficiency::Moderate => "Moderately efficient CPU usage",
            CpuEfficiency::Low => "Low CPU efficiency (high overhead)",
        }
    }
}

/// CPU profile of the super query.
pub struct CpuAnalysis;

impl Analysis for CpuAnalysis {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn title(&self) -> &'static str {
        "CPU usage analysis"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[columns::ITERATION, columns::SUPER_CPU, columns::SUPER_TIME]
    }

    fn image_name(&self) -> &'static str {
        "cpu_usage_analysis.svg"
    }

    fn analyze(&self, dataset: &Dataset, config: &AnalysisConfig) -> Result<AnalysisOutput> {
        let x = dataset.iterations()?;
        let cpu = summarized(dataset, columns::SUPER_CPU, Some(Strategy::SuperQuery), Metric::CpuTime)?;
        let time = summarized(dataset, columns::SUPER_TIME, Some(Strategy::SuperQuery), Metric::ExecutionTime)?;

        // Execution time over CPU time
        let efficiency = checked_ratio(time.summary.mean, cpu.summary.mean, "mean of super_cpu")? * 100.0;

        let profile = resource_profile(
            &cpu,
            &time,
            &x,
            config.histogram_bins,
            vec![("CPU Efficiency".to_string(), format!("{:.1}%", efficiency))],
        )?;

        let s = &cpu.summary;
        let m = s.metric;
        let mut report = Report::new(self.title());
        report.section(
            ReportSection::new("CPU Usage Statistics")
                .line(format!("Mean: {} ms ± {} ms", m.format(s.mean), m.format(s.std)))
                .line(format!("Range: {} - {} ms", m.format(s.min), m.format(s.max)))
                .line(format!("Coefficient of Variation: {:.1}%", profile.cv_percent))
                .line(format!("CPU-Time Correlation: {}", format_correlation(profile.correlation))),
        );
        report.section(
            ReportSection::new("CPU Efficiency Analysis")
                .line(format!("CPU Efficiency: {:.1}% (Execution Time / CPU Time)", efficiency))
                .line(format!("→ {}", CpuEfficiency::classify(efficiency).description()))
                .line(format!(
                    "→ {}",
                    describe_correlation(
                        profile.correlation,
                        STRONG_CORRELATION,
                        MODERATE_CORRELATION,
                        "execution time"
                    )
                )),
        );
        report.section(
            ReportSection::new("CPU Consistency")
                .line(format!("→ {}", Variability::classify(profile.cv_percent).consistency("CPU"))),
        );
        report.block(profile.table);

        let chart_set = ChartSet::grid("CPU Usage Analysis - Super Query Performance", 2, profile.panels);
        Ok(AnalysisOutput::new(self, &[cpu, time], Vec::new(), chart_set, report.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::full_dataset;
    use crate::analysis::run;
    use crate::charts::PanelKind;
    use crate::error::AnalysisError;

    #[test]
    fn test_efficiency_classes() {
        assert_eq!(CpuEfficiency::classify(125.0), CpuEfficiency::High);
        assert_eq!(CpuEfficiency::classify(80.0), CpuEfficiency::Moderate);
        assert_eq!(CpuEfficiency::classify(60.0), CpuEfficiency::Low);
    }

    #[test]
    fn test_cpu_report() {
        let output = run(&CpuAnalysis, &full_dataset(), &AnalysisConfig::default()).unwrap();

        // mean time 100, mean cpu 80
        assert!(output.report.contains("CPU Efficiency: 125.0% (Execution Time / CPU Time)"));
        assert!(output.report.contains("→ Highly efficient CPU usage"));
        assert!(output.report.contains("Strong positive correlation with execution time"));
        assert!(output.report.contains("→ Very consistent CPU usage (CV < 10%)"));
        assert!(output.report.contains("Mean: 80.0 ms ± "));
    }

    #[test]
    fn test_cpu_panels_use_configured_bins() {
        let config = AnalysisConfig {
            histogram_bins: 5,
            ..AnalysisConfig::default()
        };
        let output = run(&CpuAnalysis, &full_dataset(), &config).unwrap();
        assert_eq!(output.charts.panels.len(), 4);
        match &output.charts.panels[1].kind {
            PanelKind::Histogram { bins, .. } => assert_eq!(bins.len(), 5),
            other => panic!("unexpected panel: {other:?}"),
        }
        match &output.charts.panels[2].kind {
            PanelKind::Scatter { trend, .. } => assert!(trend.is_some()),
            other => panic!("unexpected panel: {other:?}"),
        }
    }

    #[test]
    fn test_zero_cpu_mean_is_degenerate() {
        let dataset = Dataset::from_columns(
            "idle.csv",
            vec![
                (columns::ITERATION, vec![1.0, 2.0]),
                (columns::SUPER_CPU, vec![0.0, 0.0]),
                (columns::SUPER_TIME, vec![10.0, 11.0]),
            ],
        )
        .unwrap();
        let err = run(&CpuAnalysis, &dataset, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateMean { .. }));
    }
}
