use crate::analysis::{resource_profile, summarized, Analysis, AnalysisOutput};
use crate::charts::ChartSet;
use crate::config::AnalysisConfig;
use crate::dataset::{columns, Dataset, Metric, Strategy};
use crate::error::Result;
use crate::report::{describe_correlation, format_correlation, Report, ReportSection, Variability};

const STRONG_CORRELATION: f64 = 0.5;
const MODERATE_CORRELATION: f64 = 0.3;

/// Memory profile of the super query.
pub struct MemoryAnalysis;

impl Analysis for MemoryAnalysis {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn title(&self) -> &'static str {
        "Memory usage analysis"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[columns::ITERATION, columns::SUPER_MEMORY, columns::SUPER_TIME]
    }

    fn image_name(&self) -> &'static str {
        "memory_usage_analysis.svg"
    }

    fn analyze(&self, dataset: &Dataset, config: &AnalysisConfig) -> Result<AnalysisOutput> {
        let x = dataset.iterations()?;
        let memory = summarized(dataset, columns::SUPER_MEMORY, Some(Strategy::SuperQuery), Metric::Memory)?;
        let time = summarized(dataset, columns::SUPER_TIME, Some(Strategy::SuperQuery), Metric::ExecutionTime)?;

        let profile = resource_profile(&memory, &time, &x, config.histogram_bins, Vec::new())?;

        let s = &memory.summary;
        let m = s.metric;
        let mut report = Report::new(self.title());
        report.section(
            ReportSection::new("Memory Usage Statistics")
                .line(format!("Mean: {} MB ± {} MB", m.format(s.mean), m.format(s.std)))
                .line(format!("Range: {} - {} MB", m.format(s.min), m.format(s.max)))
                .line(format!("Coefficient of Variation: {:.1}%", profile.cv_percent))
                .line(format!("Memory-Time Correlation: {}", format_correlation(profile.correlation)))
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
            ReportSection::new("Memory Efficiency")
                .line(format!("→ {}", Variability::classify(profile.cv_percent).consistency("memory"))),
        );
        report.block(profile.table);

        let chart_set = ChartSet::grid("Memory Usage Analysis - Super Query Performance", 2, profile.panels);
        Ok(AnalysisOutput::new(self, &[memory, time], Vec::new(), chart_set, report.render()))
    }
}
