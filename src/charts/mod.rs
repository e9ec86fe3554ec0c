//! Declarative chart descriptions.
//!
//! Panels carry fully computed data (points, bins, quartiles, trend lines,
//! table cells). Drawing them is the job of [`crate::plot`]; nothing here
//! knows about pixels, colors or files.

use serde::{Deserialize, Serialize};

use crate::comparison::Comparison;
use crate::dataset::{Metric, Series};
use crate::report::format_cv;
use crate::statistics::{self, Bin, LinearFit, SummarizedSeries};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChartSet {
    pub title: String,
    pub rows: usize,
    pub cols: usize,
    pub panels: Vec<Panel>,
}

impl ChartSet {
    /// Lays `panels` out row by row, `cols` per row.
    pub fn grid(title: impl Into<String>, cols: usize, panels: Vec<Panel>) -> Self {
        let cols = cols.max(1).min(panels.len().max(1));
        let rows = panels.len().div_ceil(cols).max(1);
        ChartSet {
            title: title.into(),
            rows,
            cols,
            panels,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: PanelKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A constant line across the panel (equal-performance line, mean, median).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReferenceLine {
    pub label: String,
    pub value: f64,
    pub orientation: Orientation,
    pub style: LineStyle,
}

impl ReferenceLine {
    pub fn horizontal(label: impl Into<String>, value: f64, style: LineStyle) -> Self {
        ReferenceLine {
            label: label.into(),
            value,
            orientation: Orientation::Horizontal,
            style,
        }
    }

    pub fn vertical(label: impl Into<String>, value: f64, style: LineStyle) -> Self {
        ReferenceLine {
            label: label.into(),
            value,
            orientation: Orientation::Vertical,
            style,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Line {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    /// Symmetric error bar half-height drawn at every point.
    pub error: Option<f64>,
}

/// Horizontal band `lower..upper`, typically mean ± one standard deviation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Band {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub label: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScatterGroup {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrendLine {
    pub fit: LinearFit,
    pub x_min: f64,
    pub x_max: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BarGroup {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum PanelKind {
    TimeSeries {
        lines: Vec<Line>,
        bands: Vec<Band>,
        references: Vec<ReferenceLine>,
    },
    BoxPlot {
        boxes: Vec<BoxStats>,
    },
    Histogram {
        bins: Vec<Bin>,
        markers: Vec<ReferenceLine>,
    },
    Scatter {
        groups: Vec<ScatterGroup>,
        trend: Option<TrendLine>,
    },
    Bars {
        groups: Vec<BarGroup>,
        references: Vec<ReferenceLine>,
    },
    Radar {
        label: String,
        axes: Vec<String>,
        values: Vec<f64>,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

/// How the spread of each line is shown on a time-series panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spread {
    None,
    ErrorBars,
    Band,
}

fn points(x: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    x.iter().copied().zip(values.iter().copied()).collect()
}

/// Iteration numbers `1..=n`, for data without an explicit iteration column.
pub fn iteration_axis(n: usize) -> Vec<f64> {
    (1..=n).map(|i| i as f64).collect()
}

/// Lines over iterations, one per series, with the chosen spread marker.
pub fn time_series_panel(
    title: impl Into<String>,
    x: &[f64],
    series: &[&SummarizedSeries],
    spread: Spread,
) -> Panel {
    let mut lines = Vec::new();
    let mut bands = Vec::new();

    for s in series {
        let summary = &s.summary;
        let name = s.series.display_name();
        lines.push(Line {
            label: format!(
                "{} (μ={}±{}{})",
                name,
                summary.metric.format(summary.mean),
                summary.metric.format(summary.std),
                summary.metric.unit()
            ),
            points: points(x, &s.series.values),
            error: (spread == Spread::ErrorBars).then_some(summary.std),
        });
        if spread == Spread::Band {
            bands.push(Band {
                label: format!("{} ±1σ", name),
                lower: summary.mean - summary.std,
                upper: summary.mean + summary.std,
            });
        }
    }

    let y_label = series
        .first()
        .map(|s| s.summary.metric.axis_label())
        .unwrap_or_default();

    Panel {
        title: title.into(),
        x_label: "Iteration".to_string(),
        y_label,
        kind: PanelKind::TimeSeries {
            lines,
            bands,
            references: Vec::new(),
        },
    }
}

/// Adds a reference line to a panel that can carry one. Other panels are
/// returned unchanged.
pub fn with_reference(mut panel: Panel, reference: ReferenceLine) -> Panel {
    match &mut panel.kind {
        PanelKind::TimeSeries { references, .. } | PanelKind::Bars { references, .. } => references.push(reference),
        PanelKind::Histogram { markers, .. } => markers.push(reference),
        _ => {}
    }
    panel
}

/// Adds a dashed mean line to a time-series panel.
pub fn with_mean_line(panel: Panel, summary: &statistics::Summary) -> Panel {
    let m = summary.metric;
    with_reference(
        panel,
        ReferenceLine::horizontal(
            format!("Mean: {}{}", m.format(summary.mean), m.unit()),
            summary.mean,
            LineStyle::Dashed,
        ),
    )
}

/// Quartile box per series with Tukey whiskers (1.5 IQR).
pub fn box_plot_panel(title: impl Into<String>, series: &[&SummarizedSeries]) -> Panel {
    let boxes = series
        .iter()
        .map(|s| {
            let summary = &s.summary;
            let low_fence = summary.q1 - 1.5 * summary.iqr;
            let high_fence = summary.q3 + 1.5 * summary.iqr;
            let inside = s.series.values.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence);

            BoxStats {
                label: s.series.strategy.map(|st| st.short_name().to_string()).unwrap_or_else(|| s.series.label.clone()),
                q1: summary.q1,
                median: summary.median,
                q3: summary.q3,
                whisker_low: inside.clone().fold(summary.q1, f64::min),
                whisker_high: inside.fold(summary.q3, f64::max),
                outliers: s
                    .series
                    .values
                    .iter()
                    .copied()
                    .filter(|v| *v < low_fence || *v > high_fence)
                    .collect(),
            }
        })
        .collect();

    let y_label = series
        .first()
        .map(|s| s.summary.metric.axis_label())
        .unwrap_or_default();

    Panel {
        title: title.into(),
        x_label: String::new(),
        y_label,
        kind: PanelKind::BoxPlot { boxes },
    }
}

/// Histogram with dashed mean and solid median markers.
pub fn histogram_panel(title: impl Into<String>, series: &SummarizedSeries, bins: usize) -> Panel {
    let summary = &series.summary;
    let m = summary.metric;
    Panel {
        title: title.into(),
        x_label: m.axis_label(),
        y_label: "Frequency".to_string(),
        kind: PanelKind::Histogram {
            bins: statistics::histogram(&series.series.values, bins),
            markers: vec![
                ReferenceLine::vertical(format!("Mean: {}", m.format(summary.mean)), summary.mean, LineStyle::Dashed),
                ReferenceLine::vertical(
                    format!("Median: {}", m.format(summary.median)),
                    summary.median,
                    LineStyle::Solid,
                ),
            ],
        },
    }
}

/// Scatter of paired samples, optionally with a least-squares trend line.
pub fn scatter_panel(title: impl Into<String>, x: &Series, y: &Series, with_trend: bool) -> Panel {
    let trend = if with_trend {
        statistics::linear_fit(&x.values, &y.values).map(|fit| TrendLine {
            fit,
            x_min: x.values.iter().copied().fold(f64::INFINITY, f64::min),
            x_max: x.values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    } else {
        None
    };

    Panel {
        title: title.into(),
        x_label: x.metric.axis_label(),
        y_label: y.metric.axis_label(),
        kind: PanelKind::Scatter {
            groups: vec![ScatterGroup {
                label: y.display_name(),
                points: points(&x.values, &y.values),
            }],
            trend,
        },
    }
}

/// Several `(x, y)` groups on one scatter panel without a trend line.
pub fn multi_scatter_panel(title: impl Into<String>, pairs: &[(&Series, &Series)]) -> Panel {
    let groups = pairs
        .iter()
        .map(|(x, y)| ScatterGroup {
            label: y.display_name(),
            points: points(&x.values, &y.values),
        })
        .collect();
    let (x_label, y_label) = pairs
        .first()
        .map(|(x, y)| (x.metric.axis_label(), y.metric.axis_label()))
        .unwrap_or_default();

    Panel {
        title: title.into(),
        x_label,
        y_label,
        kind: PanelKind::Scatter { groups, trend: None },
    }
}

/// Speedup ratio per iteration with the equal-performance line, the mean
/// ratio and a ±1σ band.
pub fn ratio_panel(title: impl Into<String>, x: &[f64], comparison: &Comparison) -> Panel {
    let ratio = &comparison.ratio_summary;
    Panel {
        title: title.into(),
        x_label: "Iteration".to_string(),
        y_label: format!("Speedup Ratio ({} / {})", comparison.name_a, comparison.name_b),
        kind: PanelKind::TimeSeries {
            lines: vec![Line {
                label: "Speedup ratio".to_string(),
                points: points(x, &comparison.ratios),
                error: None,
            }],
            bands: vec![Band {
                label: "±1σ".to_string(),
                lower: ratio.mean - ratio.std,
                upper: ratio.mean + ratio.std,
            }],
            references: vec![
                ReferenceLine::horizontal("Equal Performance", 1.0, LineStyle::Dashed),
                ReferenceLine::horizontal(format!("Average Speedup: {:.2}x", ratio.mean), ratio.mean, LineStyle::Solid),
            ],
        },
    }
}

/// Grouped bars over iterations, one group per series.
pub fn bar_panel(title: impl Into<String>, x: &[f64], series: &[&Series], y_label: impl Into<String>) -> Panel {
    Panel {
        title: title.into(),
        x_label: "Iteration".to_string(),
        y_label: y_label.into(),
        kind: PanelKind::Bars {
            groups: series
                .iter()
                .map(|s| BarGroup {
                    label: s.display_name(),
                    points: points(x, &s.values),
                })
                .collect(),
            references: Vec::new(),
        },
    }
}

pub fn radar_panel(title: impl Into<String>, label: impl Into<String>, axes: &[&str], values: &[f64]) -> Panel {
    Panel {
        title: title.into(),
        x_label: String::new(),
        y_label: String::new(),
        kind: PanelKind::Radar {
            label: label.into(),
            axes: axes.iter().map(|a| a.to_string()).collect(),
            values: values.to_vec(),
        },
    }
}

pub fn table_panel(title: impl Into<String>, header: Vec<String>, rows: Vec<Vec<String>>) -> Panel {
    Panel {
        title: title.into(),
        x_label: String::new(),
        y_label: String::new(),
        kind: PanelKind::Table { header, rows },
    }
}

const DEFAULT_RATIO_BINS: usize = 10;

/// Default chart set for summarized series and their comparisons.
///
/// Per metric: a time series with error bands and a box plot. Per
/// comparison: the ratio distribution and an `a` vs `b` scatter with trend.
/// A summary table closes the set.
pub fn render_charts(bundles: &[SummarizedSeries], comparisons: &[Comparison]) -> ChartSet {
    let mut panels = Vec::new();

    let mut metrics: Vec<Metric> = Vec::new();
    for b in bundles {
        if !metrics.contains(&b.summary.metric) {
            metrics.push(b.summary.metric);
        }
    }

    for metric in metrics {
        let group: Vec<&SummarizedSeries> = bundles.iter().filter(|b| b.summary.metric == metric).collect();
        let n = group.iter().map(|b| b.series.len()).max().unwrap_or(0);
        let x = iteration_axis(n);
        panels.push(time_series_panel(
            format!("{} Comparison", metric.name()),
            &x,
            &group,
            Spread::Band,
        ));
        panels.push(box_plot_panel(format!("{} Distribution", metric.name()), &group));
    }

    for c in comparisons {
        let ratios = SummarizedSeries {
            series: c.ratio_series(),
            summary: c.ratio_summary.clone(),
        };
        panels.push(histogram_panel("Speedup Distribution", &ratios, DEFAULT_RATIO_BINS));

        let a = bundles.iter().find(|b| b.series.label == c.label_a);
        let b = bundles.iter().find(|b| b.series.label == c.label_b);
        if let (Some(a), Some(b)) = (a, b) {
            let r = statistics::pearson(&a.series.values, &b.series.values);
            let title = match r {
                Some(r) => format!("{} Correlation (r={:.3})", c.metric.name(), r),
                None => format!("{} Correlation", c.metric.name()),
            };
            panels.push(scatter_panel(title, &a.series, &b.series, true));
        }
    }

    panels.push(summary_table_panel(bundles));

    ChartSet::grid("Benchmark Comparison", 3, panels)
}

/// Summary bundle as a table panel, one row per series.
pub fn summary_table_panel(bundles: &[SummarizedSeries]) -> Panel {
    let header = ["Series", "Mean", "Std Dev", "Min", "Max", "Median", "CV (%)"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = bundles
        .iter()
        .map(|b| {
            let s = &b.summary;
            let m = s.metric;
            vec![
                format!("{} ({})", b.series.display_name(), m.unit()),
                m.format(s.mean),
                m.format(s.std),
                m.format(s.min),
                m.format(s.max),
                m.format(s.median),
                format_cv(s),
            ]
        })
        .collect();
    table_panel("Summary Statistics", header, rows)
}
