use prettytable::{format, row, Table};

use crate::comparison::Comparison;
use crate::statistics::{Summary, SummarizedSeries};

const BANNER_WIDTH: usize = 70;

/// A titled group of indented report lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub heading: String,
    pub lines: Vec<String>,
}

impl ReportSection {
    pub fn new(heading: impl Into<String>) -> Self {
        ReportSection {
            heading: heading.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn render(&self) -> String {
        let mut out = format!("{}:\n", self.heading);
        for line in &self.lines {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// The console report of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    blocks: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Report {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn section(&mut self, section: ReportSection) -> &mut Self {
        self.blocks.push(section.render());
        self
    }

    /// Appends preformatted text such as the output of [`render_report`].
    pub fn block(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(text.into());
        self
    }

    pub fn render(&self) -> String {
        let banner = "=".repeat(BANNER_WIDTH);
        let mut out = format!("{}\n{}\n{}\n", banner, self.title.to_uppercase(), banner);
        for block in &self.blocks {
            out.push('\n');
            out.push_str(block.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Renders the summary table and every comparison as plain text.
///
/// Deterministic: the same inputs always give byte-identical output.
pub fn render_report(bundles: &[SummarizedSeries], comparisons: &[Comparison]) -> String {
    let mut out = String::new();

    if !bundles.is_empty() {
        out.push_str("Summary Statistics:\n");
        out.push_str(&summary_table(bundles.iter().map(|b| &b.summary)).to_string());
    }

    for comparison in comparisons {
        out.push('\n');
        out.push_str(&comparison_section(comparison).render());
    }

    out
}

fn summary_table<'a>(summaries: impl Iterator<Item = &'a Summary>) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row![
        "Series", "N", "Mean", "Std Dev", "Min", "Max", "Median", "IQR", "CV (%)"
    ]);

    for s in summaries {
        let m = s.metric;
        table.add_row(row![
            format!("{} ({})", s.label, m.unit()),
            s.n,
            m.format(s.mean),
            m.format(s.std),
            m.format(s.min),
            m.format(s.max),
            m.format(s.median),
            m.format(s.iqr),
            format_cv(s),
        ]);
    }
    table
}

fn comparison_section(c: &Comparison) -> ReportSection {
    let m = c.metric;
    let unit = m.unit();
    let ci = &c.confidence_interval;

    ReportSection::new(format!("{} vs {} ({})", c.name_a, c.name_b, m.name()))
        .line(format!(
            "Mean: {} {unit} vs {} {unit} (difference {} {unit})",
            m.format(c.mean_a),
            m.format(c.mean_b),
            m.format(c.mean_difference)
        ))
        .line(format!(
            "Paired t-test: t = {:.4}, df = {}, p = {} ({:.6})",
            c.t_statistic,
            c.degrees_of_freedom,
            format_p_value(c.p_value),
            c.p_value
        ))
        .line(format!(
            "Significant (p < 0.05): {}",
            if c.significant { "Yes" } else { "No" }
        ))
        .line(format!(
            "Cohen's d: {:.4} ({} effect)",
            c.cohens_d,
            c.effect_size.label()
        ))
        .line(format!(
            "95% CI for mean difference: {} ± {} {unit} [{}, {}]",
            m.format(ci.center),
            m.format(ci.margin),
            m.format(ci.lower),
            m.format(ci.upper)
        ))
        .line(format!(
            "Speedup ratio ({} / {}): {:.2}x ± {:.2}x (median {:.2}x)",
            c.label_a, c.label_b, c.ratio_summary.mean, c.ratio_summary.std, c.ratio_summary.median
        ))
        .line(format!(
            "Ratio > 1: {}/{} iterations",
            c.tally.ratio_above_one,
            c.tally.total()
        ))
}

/// Two-column `Statistic | Value` table used by single-series analyses.
pub fn statistic_table(rows: &[(String, String)]) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row!["Statistic", "Value"]);
    for (name, value) in rows {
        table.add_row(row![name, value]);
    }
    table.to_string()
}

pub fn format_p_value(p: f64) -> String {
    format!("{:.2e}", p)
}

pub fn format_cv(summary: &Summary) -> String {
    match summary.cv_percent {
        Some(cv) => format!("{:.1}", cv),
        None => "n/a".to_string(),
    }
}

pub fn format_correlation(r: Option<f64>) -> String {
    match r {
        Some(r) => format!("r = {:.3}", r),
        None => "r undefined (no variance)".to_string(),
    }
}

/// Relative dispersion classes used for consistency statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variability {
    Low,
    Moderate,
    High,
}

impl Variability {
    pub fn classify(cv_percent: f64) -> Self {
        if cv_percent < 10.0 {
            Variability::Low
        } else if cv_percent < 20.0 {
            Variability::Moderate
        } else {
            Variability::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Variability::Low => "Low",
            Variability::Moderate => "Moderate",
            Variability::High => "High",
        }
    }

    /// Sentence used by the single-resource analyses.
    pub fn consistency(&self, resource: &str) -> String {
        match self {
            Variability::Low => format!("Very consistent {} usage (CV < 10%)", resource),
            Variability::Moderate => format!("Moderately consistent {} usage (CV < 20%)", resource),
            Variability::High => format!("Variable {} usage (CV ≥ 20%)", resource),
        }
    }
}

/// Describes a correlation given the strong/moderate thresholds of a variant.
pub fn describe_correlation(r: Option<f64>, strong: f64, moderate: f64, target: &str) -> String {
    let Some(r) = r else {
        return format!("Correlation with {} is undefined (constant series)", target);
    };
    let direction = if r > 0.0 { "positive" } else { "negative" };
    if r.abs() > strong {
        format!("Strong {} correlation with {}", direction, target)
    } else if r.abs() > moderate {
        format!("Moderate {} correlation with {}", direction, target)
    } else {
        format!("Weak correlation with {}", target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::compare;
    use crate::dataset::{Metric, Series, Strategy};

    fn bundle(label: &str, strategy: Strategy, values: &[f64]) -> SummarizedSeries {
        SummarizedSeries::new(Series::new(label, Some(strategy), Metric::ExecutionTime, values.to_vec())).unwrap()
    }

    #[test]
    fn test_render_report_contains_every_quantity() {
        let a = bundle("super_time", Strategy::SuperQuery, &[100.0, 110.0, 90.0, 105.0, 95.0]);
        let b = bundle("par_total_time", Strategy::ParallelJoin, &[50.0, 55.0, 45.0, 52.0, 48.0]);
        let comparison = compare(&a.series, &b.series).unwrap();

        let text = render_report(&[a, b], &[comparison]);
        assert!(text.contains("Summary Statistics:"));
        assert!(text.contains("super_time (ms)"));
        assert!(text.contains("100.00"));
        assert!(text.contains("Super Query vs Parallel+Join (Execution Time)"));
        assert!(text.contains("Significant (p < 0.05): Yes"));
        assert!(text.contains("Large effect"));
        assert!(text.contains("Speedup ratio (super_time / par_total_time): 2.00x"));
        assert!(text.contains("Ratio > 1: 5/5 iterations"));
    }

    #[test]
    fn test_render_report_is_deterministic() {
        let a = bundle("super_time", Strategy::SuperQuery, &[3.0, 4.0, 5.0]);
        let b = bundle("par_total_time", Strategy::ParallelJoin, &[1.0, 2.0, 2.5]);
        let comparison = compare(&a.series, &b.series).unwrap();

        let first = render_report(&[a.clone(), b.clone()], std::slice::from_ref(&comparison));
        let second = render_report(&[a, b], &[comparison]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_mean_cv_is_not_printed_as_nan() {
        let zero = SummarizedSeries::new(Series::new("delta", None, Metric::Memory, vec![-1.0, 1.0])).unwrap();
        let text = render_report(&[zero], &[]);
        assert!(text.contains("n/a"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn test_report_layout() {
        let mut report = Report::new("Memory usage analysis");
        report.section(ReportSection::new("Memory Efficiency").line("Very consistent"));
        let text = report.render();

        assert!(text.starts_with(&"=".repeat(BANNER_WIDTH)));
        assert!(text.contains("MEMORY USAGE ANALYSIS"));
        assert!(text.contains("Memory Efficiency:\n  Very consistent\n"));
    }

    #[test]
    fn test_classifications() {
        assert_eq!(Variability::classify(5.0), Variability::Low);
        assert_eq!(Variability::classify(10.0), Variability::Moderate);
        assert_eq!(Variability::classify(25.0).label(), "High");
        assert_eq!(
            describe_correlation(Some(-0.8), 0.7, 0.5, "execution time"),
            "Strong negative correlation with execution time"
        );
        assert_eq!(
            describe_correlation(Some(0.4), 0.5, 0.3, "execution time"),
            "Moderate positive correlation with execution time"
        );
        assert!(describe_correlation(None, 0.5, 0.3, "x").contains("undefined"));
        assert_eq!(format_p_value(0.000012345), "1.23e-5");
    }

    #[test]
    fn test_statistic_table() {
        let text = statistic_table(&[("Mean".to_string(), "12.00 MB".to_string())]);
        assert!(text.contains("Statistic"));
        assert!(text.contains("12.00 MB"));
    }
}
