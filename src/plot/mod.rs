//! SVG rendering of [`ChartSet`] descriptions with plotters.

use std::error::Error;
use std::f64::consts::PI;
use std::ops::Range;
use std::path::Path;

use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::charts::{
    Band, BarGroup, BoxStats, ChartSet, Line, LineStyle, Orientation, Panel, PanelKind, ReferenceLine, ScatterGroup,
    TrendLine,
};
use crate::error::{AnalysisError, Result};
use crate::statistics::Bin;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type DrawResult = std::result::Result<(), Box<dyn Error>>;

const FONT: &str = "sans-serif";
const DASH_SEGMENTS: usize = 60;

/// Draws every panel of `set` into an SVG file at `path`.
pub fn draw_chart_set(set: &ChartSet, path: &Path, size: (u32, u32)) -> Result<()> {
    draw(set, path, size).map_err(AnalysisError::render)?;
    info!("Chart saved to {}", path.display());
    Ok(())
}

fn draw(set: &ChartSet, path: &Path, size: (u32, u32)) -> DrawResult {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let titled = root.titled(&set.title, (FONT, 28))?;

    let areas = titled.split_evenly((set.rows, set.cols));
    for (panel, area) in set.panels.iter().zip(areas.iter()) {
        draw_panel(panel, area)?;
    }

    root.present()?;
    Ok(())
}

fn draw_panel(panel: &Panel, area: &Area) -> DrawResult {
    match &panel.kind {
        PanelKind::TimeSeries {
            lines,
            bands,
            references,
        } => draw_time_series(panel, area, lines, bands, references),
        PanelKind::BoxPlot { boxes } => draw_box_plot(panel, area, boxes),
        PanelKind::Histogram { bins, markers } => draw_histogram(panel, area, bins, markers),
        PanelKind::Scatter { groups, trend } => draw_scatter(panel, area, groups, trend.as_ref()),
        PanelKind::Bars { groups, references } => draw_bars(panel, area, groups, references),
        PanelKind::Radar { label, axes, values } => draw_radar(panel, area, label, axes, values),
        PanelKind::Table { header, rows } => draw_table(panel, area, header, rows),
    }
}

/// Axis range covering `values`, padded by 5% on both sides.
fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !lo.is_finite() {
        return 0.0..1.0;
    }
    if lo == hi {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
        return (lo - pad)..(hi + pad);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

/// Endpoints of the visible segments of a dashed line.
fn dashes(from: (f64, f64), to: (f64, f64)) -> Vec<Vec<(f64, f64)>> {
    let step = |i: usize| {
        let t = i as f64 / DASH_SEGMENTS as f64;
        (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t)
    };
    (0..DASH_SEGMENTS)
        .step_by(2)
        .map(|i| vec![step(i), step(i + 1)])
        .collect()
}

fn draw_reference<DB: DrawingBackend, CT: CoordTranslate<From = (f64, f64)>>(
    chart: &mut ChartContext<DB, CT>,
    reference: &ReferenceLine,
    x_range: &Range<f64>,
    y_range: &Range<f64>,
    color: RGBColor,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (from, to) = match reference.orientation {
        Orientation::Horizontal => ((x_range.start, reference.value), (x_range.end, reference.value)),
        Orientation::Vertical => ((reference.value, y_range.start), (reference.value, y_range.end)),
    };
    let style = color.stroke_width(2);

    let anno = match reference.style {
        LineStyle::Solid => chart.draw_series(std::iter::once(PathElement::new(vec![from, to], style)))?,
        LineStyle::Dashed => chart.draw_series(dashes(from, to).into_iter().map(|d| PathElement::new(d, style)))?,
    };
    anno.label(reference.label.clone())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    Ok(())
}

const REFERENCE_COLORS: [RGBColor; 3] = [BLACK, RED, GREEN];

fn draw_time_series(
    panel: &Panel,
    area: &Area,
    lines: &[Line],
    bands: &[Band],
    references: &[ReferenceLine],
) -> DrawResult {
    let x_range = padded_range(lines.iter().flat_map(|l| l.points.iter().map(|p| p.0)));
    let y_range = padded_range(
        lines
            .iter()
            .flat_map(|l| {
                let e = l.error.unwrap_or(0.0);
                l.points.iter().flat_map(move |p| [p.1 - e, p.1 + e])
            })
            .chain(bands.iter().flat_map(|b| [b.lower, b.upper]))
            .chain(references.iter().filter(|r| r.orientation == Orientation::Horizontal).map(|r| r.value)),
    );

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;
    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .draw()?;

    for (i, band) in bands.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x_range.start, band.lower), (x_range.end, band.upper)],
                color.mix(0.15).filled(),
            )))?
            .label(band.label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.mix(0.15).filled()));
    }

    for (i, line) in lines.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(line.points.iter().copied(), color.stroke_width(2)))?
            .label(line.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        if let Some(e) = line.error {
            chart.draw_series(
                line.points
                    .iter()
                    .map(|&(x, y)| ErrorBar::new_vertical(x, y - e, y, y + e, color.mix(0.6).filled(), 6)),
            )?;
        }
    }

    for (i, reference) in references.iter().enumerate() {
        let color = REFERENCE_COLORS[i % REFERENCE_COLORS.len()];
        draw_reference(&mut chart, reference, &x_range, &y_range, color)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_box_plot(panel: &Panel, area: &Area, boxes: &[BoxStats]) -> DrawResult {
    let x_range = -0.5..(boxes.len() as f64 - 0.5);
    let y_range = padded_range(
        boxes
            .iter()
            .flat_map(|b| [b.whisker_low, b.whisker_high].into_iter().chain(b.outliers.iter().copied())),
    );

    let labels: Vec<&str> = boxes.iter().map(|b| b.label.as_str()).collect();
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(boxes.len())
        .x_label_formatter(&|x| {
            let idx = x.round();
            if idx < 0.0 || (x - idx).abs() > 1e-6 {
                return String::new();
            }
            labels.get(idx as usize).map(|l| l.to_string()).unwrap_or_default()
        })
        .y_desc(panel.y_label.as_str())
        .draw()?;

    for (i, b) in boxes.iter().enumerate() {
        let x = i as f64;
        let color = Palette99::pick(i).to_rgba();
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.3, b.q1), (x + 0.3, b.q3)],
            color.mix(0.7).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new([(x - 0.3, b.q1), (x + 0.3, b.q3)], BLACK)))?;
        chart.draw_series([
            PathElement::new(vec![(x - 0.3, b.median), (x + 0.3, b.median)], BLACK.stroke_width(2)),
            PathElement::new(vec![(x, b.q3), (x, b.whisker_high)], BLACK),
            PathElement::new(vec![(x, b.q1), (x, b.whisker_low)], BLACK),
            PathElement::new(vec![(x - 0.15, b.whisker_high), (x + 0.15, b.whisker_high)], BLACK),
            PathElement::new(vec![(x - 0.15, b.whisker_low), (x + 0.15, b.whisker_low)], BLACK),
        ])?;
        chart.draw_series(b.outliers.iter().map(|&o| Circle::new((x, o), 3, BLACK)))?;
    }
    Ok(())
}

fn draw_histogram(panel: &Panel, area: &Area, bins: &[Bin], markers: &[ReferenceLine]) -> DrawResult {
    let x_range = padded_range(
        bins.iter()
            .flat_map(|b| [b.lower, b.upper])
            .chain(markers.iter().map(|m| m.value)),
    );
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64;
    let y_range = 0.0..max_count * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;
    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .draw()?;

    let fill = Palette99::pick(0).to_rgba();
    chart.draw_series(
        bins.iter()
            .map(|b| Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], fill.mix(0.7).filled())),
    )?;
    chart.draw_series(
        bins.iter()
            .map(|b| Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], BLACK)),
    )?;

    for (i, marker) in markers.iter().enumerate() {
        let color = REFERENCE_COLORS[(i + 1) % REFERENCE_COLORS.len()];
        draw_reference(&mut chart, marker, &x_range, &y_range, color)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_scatter(panel: &Panel, area: &Area, groups: &[ScatterGroup], trend: Option<&TrendLine>) -> DrawResult {
    let x_range = padded_range(groups.iter().flat_map(|g| g.points.iter().map(|p| p.0)));
    let y_range = padded_range(groups.iter().flat_map(|g| g.points.iter().map(|p| p.1)));

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .draw()?;

    for (i, group) in groups.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(group.points.iter().map(|&p| Circle::new(p, 4, color.mix(0.6).filled())))?
            .label(group.label.clone())
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    if let Some(trend) = trend {
        let from = (trend.x_min, trend.fit.predict(trend.x_min));
        let to = (trend.x_max, trend.fit.predict(trend.x_max));
        chart
            .draw_series(dashes(from, to).into_iter().map(|d| PathElement::new(d, RED.stroke_width(2))))?
            .label("Trend")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_bars(panel: &Panel, area: &Area, groups: &[BarGroup], references: &[ReferenceLine]) -> DrawResult {
    let x_range = padded_range(
        groups
            .iter()
            .flat_map(|g| g.points.iter().flat_map(|p| [p.0 - 0.5, p.0 + 0.5])),
    );
    let y_range = padded_range(
        groups
            .iter()
            .flat_map(|g| g.points.iter().map(|p| p.1))
            .chain(std::iter::once(0.0))
            .chain(references.iter().map(|r| r.value)),
    );

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;
    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .draw()?;

    let width = 0.8 / groups.len().max(1) as f64;
    for (g, group) in groups.iter().enumerate() {
        let color = Palette99::pick(g).to_rgba();
        let offset = -0.4 + g as f64 * width;
        chart
            .draw_series(group.points.iter().map(|&(x, y)| {
                Rectangle::new([(x + offset, 0.0), (x + offset + width, y)], color.mix(0.8).filled())
            }))?
            .label(group.label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.mix(0.8).filled()));
    }

    for (i, reference) in references.iter().enumerate() {
        let color = REFERENCE_COLORS[i % REFERENCE_COLORS.len()];
        draw_reference(&mut chart, reference, &x_range, &y_range, color)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// Point on the unit circle for radar axis `i` of `n`, starting at the top.
fn radar_point(i: usize, n: usize, radius: f64) -> (f64, f64) {
    let angle = PI / 2.0 - 2.0 * PI * i as f64 / n as f64;
    (radius * angle.cos(), radius * angle.sin())
}

fn draw_radar(panel: &Panel, area: &Area, label: &str, axes: &[String], values: &[f64]) -> DrawResult {
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, 20))
        .margin(20)
        .build_cartesian_2d(-1.4..1.4, -1.4..1.4)?;

    let n = axes.len().max(1);
    for ring in [0.25, 0.5, 0.75, 1.0] {
        let mut outline: Vec<(f64, f64)> = (0..n).map(|i| radar_point(i, n, ring)).collect();
        outline.push(radar_point(0, n, ring));
        chart.draw_series(std::iter::once(PathElement::new(outline, BLACK.mix(0.2))))?;
    }
    for (i, axis) in axes.iter().enumerate() {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(0.0, 0.0), radar_point(i, n, 1.0)],
            BLACK.mix(0.3),
        )))?;
        let (x, y) = radar_point(i, n, 1.2);
        chart.draw_series(std::iter::once(Text::new(
            axis.clone(),
            (x - 0.15, y),
            (FONT, 14),
        )))?;
    }

    let shape: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| radar_point(i, n, v.clamp(0.0, 1.0)))
        .collect();
    let color = Palette99::pick(1).to_rgba();
    chart.draw_series(std::iter::once(Polygon::new(shape.clone(), color.mix(0.25).filled())))?;
    let mut outline = shape;
    if let Some(&first) = outline.first() {
        outline.push(first);
    }
    chart
        .draw_series(std::iter::once(PathElement::new(outline, color.stroke_width(2))))?
        .label(label.to_string())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_table(panel: &Panel, area: &Area, header: &[String], rows: &[Vec<String>]) -> DrawResult {
    let area = area.titled(&panel.title, (FONT, 20))?;
    let (width, _) = area.dim_in_pixel();
    let cols = header.len().max(1) as i32;
    let col_width = (width as i32 - 20) / cols;
    let row_height = 24;

    let header_style = TextStyle::from((FONT, 15).into_font().style(FontStyle::Bold));
    for (c, cell) in header.iter().enumerate() {
        area.draw(&Text::new(cell.clone(), (10 + c as i32 * col_width, 10), header_style.clone()))?;
    }
    for (r, row) in rows.iter().enumerate() {
        let y = 10 + (r as i32 + 1) * row_height;
        for (c, cell) in row.iter().enumerate() {
            area.draw(&Text::new(cell.clone(), (10 + c as i32 * col_width, y), (FONT, 14)))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{render_charts, table_panel};
    use crate::comparison::compare;
    use crate::dataset::{Metric, Series, Strategy};
    use crate::statistics::SummarizedSeries;

    #[test]
    fn test_padded_range() {
        let r = padded_range([0.0, 10.0]);
        assert!((r.start + 0.5).abs() < 1e-12);
        assert!((r.end - 10.5).abs() < 1e-12);

        let flat = padded_range([5.0, 5.0]);
        assert!(flat.start < 5.0 && flat.end > 5.0);

        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(padded_range([f64::NAN]), 0.0..1.0);
    }

    #[test]
    fn test_dashes_cover_half_the_line() {
        let d = dashes((0.0, 1.0), (60.0, 1.0));
        assert_eq!(d.len(), DASH_SEGMENTS / 2);
        assert_eq!(d[0], vec![(0.0, 1.0), (1.0, 1.0)]);
    }

    #[test]
    fn test_radar_point_starts_at_top() {
        let (x, y) = radar_point(0, 3, 1.0);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_draw_chart_set_writes_svg() {
        let a = SummarizedSeries::new(Series::new(
            "super_time",
            Some(Strategy::SuperQuery),
            Metric::ExecutionTime,
            vec![100.0, 110.0, 90.0, 105.0, 95.0],
        ))
        .unwrap();
        let b = SummarizedSeries::new(Series::new(
            "par_total_time",
            Some(Strategy::ParallelJoin),
            Metric::ExecutionTime,
            vec![50.0, 55.0, 45.0, 52.0, 48.0],
        ))
        .unwrap();
        let comparison = compare(&a.series, &b.series).unwrap();
        let mut set = render_charts(&[a, b], &[comparison]);
        set.panels.push(table_panel("extra", vec!["k".into()], vec![vec!["v".into()]]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        draw_chart_set(&set, &path, (1200, 900)).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Benchmark Comparison"));
    }
}
