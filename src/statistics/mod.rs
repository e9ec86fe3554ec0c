//! Descriptive statistics over measurement series.
//!
//! Everything here is a pure function of its input slice. Sample variance
//! uses `n - 1` in the denominator, quantiles interpolate linearly between
//! the closest ranks.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dataset::{Metric, Series};
use crate::error::{AnalysisError, Result};

/// Summary statistic bundle for one series.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Summary {
    pub label: String,
    pub metric: Metric,
    pub n: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub range: f64,
    /// `std / mean * 100`; `None` when the mean is zero.
    pub cv_percent: Option<f64>,
}

impl Summary {
    /// Coefficient of variation in percent.
    pub fn cv(&self) -> Result<f64> {
        self.cv_percent.ok_or_else(|| AnalysisError::DegenerateMean {
            label: self.label.clone(),
        })
    }

    /// How many times more relatively dispersed this series is than `other`.
    pub fn dispersion_ratio(&self, other: &Summary) -> Result<f64> {
        let own = self.cv()?;
        let theirs = other.cv()?;
        checked_ratio(own, theirs, &format!("coefficient of variation of {}", other.label))
    }

    /// `mean ± std` with the metric's precision.
    pub fn mean_pm_std(&self) -> String {
        format!(
            "{} ± {}",
            self.metric.format(self.mean),
            self.metric.format(self.std)
        )
    }
}

/// A series together with its summary, as consumed by the report and chart builders.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SummarizedSeries {
    pub series: Series,
    pub summary: Summary,
}

impl SummarizedSeries {
    pub fn new(series: Series) -> Result<Self> {
        let summary = summarize(&series)?;
        Ok(SummarizedSeries { series, summary })
    }
}

/// Computes the summary statistic bundle of a series.
pub fn summarize(series: &Series) -> Result<Summary> {
    let values = &series.values;
    if values.is_empty() {
        return Err(AnalysisError::EmptySeries {
            label: series.label.clone(),
        });
    }

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let std = std_dev(values);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let q1 = quantile_sorted(&sorted, 0.25);
    let q3 = quantile_sorted(&sorted, 0.75);

    let cv_percent = if mean == 0.0 {
        None
    } else {
        Some(std / mean * 100.0)
    };

    let summary = Summary {
        label: series.label.clone(),
        metric: series.metric,
        n: values.len(),
        mean,
        std,
        min,
        max,
        median: quantile_sorted(&sorted, 0.5),
        q1,
        q3,
        iqr: q3 - q1,
        range: max - min,
        cv_percent,
    };
    debug!(
        "{}: n={} mean={:.4} std={:.4}",
        summary.label, summary.n, summary.mean, summary.std
    );
    Ok(summary)
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample variance (`n - 1` denominator). Zero for fewer than two samples.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

pub fn std_dev(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Quantile `q` in [0, 1] with linear interpolation, `None` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(quantile_sorted(&sorted, q))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Pearson correlation coefficient. `None` if lengths differ, fewer than two
/// pairs exist, or either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Least-squares line `y = slope * x + intercept`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Degree-1 polynomial fit. `None` when `x` has no spread or lengths differ.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;

    let sxx: f64 = x.iter().map(|a| (a - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mean_x) * (b - mean_y)).sum();

    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// One histogram bucket, `[lower, upper)` except the last which is closed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over `[min, max]`.
///
/// A constant series is spread over `[v - 0.5, v + 0.5]` so the bins keep a
/// positive width.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut result: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: lo + width * i as f64,
            upper: if i == bins - 1 { hi } else { lo + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for &v in values {
        let index = (((v - lo) / width) as usize).min(bins - 1);
        result[index].count += 1;
    }

    result
}

/// `numerator / denominator`, failing with `DegenerateMean` on a zero denominator.
pub fn checked_ratio(numerator: f64, denominator: f64, label: &str) -> Result<f64> {
    if denominator == 0.0 {
        return Err(AnalysisError::DegenerateMean {
            label: label.to_string(),
        });
    }
    Ok(numerator / denominator)
}

/// Indices of the samples at or above the `percentile` quantile, in order.
pub fn indices_at_or_above_percentile(values: &[f64], percentile: f64) -> Vec<usize> {
    let Some(threshold) = quantile(values, percentile) else {
        return Vec::new();
    };
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v >= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Drops the samples strictly below the `percentile` quantile, preserving the
/// relative order of the rest.
///
/// Used for memory readings where the collector occasionally reports large
/// negative deltas.
pub fn filter_outliers_below_percentile(series: &Series, percentile: f64) -> Result<Series> {
    if series.is_empty() {
        return Err(AnalysisError::EmptySeries {
            label: series.label.clone(),
        });
    }

    let kept: Vec<f64> = indices_at_or_above_percentile(&series.values, percentile)
        .into_iter()
        .map(|i| series.values[i])
        .collect();

    debug!(
        "{}: dropped {} of {} samples below the {:.0}th percentile",
        series.label,
        series.len() - kept.len(),
        series.len(),
        percentile * 100.0
    );
    Ok(series.with_values(kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Strategy as Approach;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn series(values: &[f64]) -> Series {
        Series::new("super_time", Some(Approach::SuperQuery), Metric::ExecutionTime, values.to_vec())
    }

    #[test]
    fn test_summarize_known_values() {
        let summary = summarize(&series(&[100.0, 110.0, 90.0, 105.0, 95.0])).unwrap();

        assert_eq!(summary.n, 5);
        assert_relative_eq!(summary.mean, 100.0);
        assert_relative_eq!(summary.std, 62.5f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(summary.min, 90.0);
        assert_relative_eq!(summary.max, 110.0);
        assert_relative_eq!(summary.median, 100.0);
        assert_relative_eq!(summary.q1, 95.0);
        assert_relative_eq!(summary.q3, 105.0);
        assert_relative_eq!(summary.iqr, 10.0);
        assert_relative_eq!(summary.range, 20.0);
        assert_relative_eq!(summary.cv().unwrap(), 62.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_summarize_empty_series() {
        let err = summarize(&series(&[])).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptySeries { ref label } if label == "super_time"));
    }

    #[test]
    fn test_summarize_single_sample() {
        let summary = summarize(&series(&[7.0])).unwrap();
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.cv().unwrap(), 0.0);
        assert_eq!(summary.median, 7.0);
    }

    #[test]
    fn test_constant_series_has_zero_cv_and_rejects_division_by_it() {
        let constant = summarize(&series(&[42.0, 42.0, 42.0, 42.0])).unwrap();
        assert_eq!(constant.std, 0.0);
        assert_eq!(constant.cv().unwrap(), 0.0);

        let varied = summarize(&series(&[1.0, 2.0, 3.0])).unwrap();
        let err = varied.dispersion_ratio(&constant).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateMean { .. }));
    }

    #[test]
    fn test_zero_mean_makes_cv_degenerate() {
        let summary = summarize(&series(&[-1.0, 1.0])).unwrap();
        assert!(summary.cv_percent.is_none());
        assert!(matches!(summary.cv(), Err(AnalysisError::DegenerateMean { .. })));
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 0.1).unwrap(), 1.3, epsilon = 1e-12);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 4.0);
        assert!(quantile(&[], 0.5).is_none());
    }

    #[test]
    fn test_pearson_perfect_and_degenerate() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-12);

        let neg: Vec<f64> = y.iter().map(|v| -v).collect();
        assert_relative_eq!(pearson(&x, &neg).unwrap(), -1.0, epsilon = 1e-12);

        assert!(pearson(&x, &[5.0, 5.0, 5.0, 5.0]).is_none());
        assert!(pearson(&x, &[1.0]).is_none());
    }

    #[test]
    fn test_linear_fit() {
        let x = [1.0, 2.0, 3.0];
        let y = [3.0, 5.0, 7.0];
        let fit = linear_fit(&x, &y).unwrap();
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.predict(10.0), 21.0, epsilon = 1e-12);

        assert!(linear_fit(&[2.0, 2.0], &[1.0, 3.0]).is_none());
    }

    #[test]
    fn test_histogram_counts_every_sample() {
        let values = [1.0, 2.0, 2.5, 3.0, 4.0, 5.0];
        let bins = histogram(&values, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_relative_eq!(bins[0].lower, 1.0);
        assert_relative_eq!(bins[3].upper, 5.0);
        // The maximum lands in the closed last bin
        assert_eq!(bins[3].count, 2);
    }

    #[test]
    fn test_histogram_constant_series() {
        let bins = histogram(&[3.0, 3.0, 3.0], 2);
        assert_relative_eq!(bins[0].lower, 2.5);
        assert_relative_eq!(bins[1].upper, 3.5);
        assert_eq!(bins[1].count, 3);
    }

    #[test]
    fn test_checked_ratio() {
        assert_relative_eq!(checked_ratio(6.0, 3.0, "x").unwrap(), 2.0);
        assert!(matches!(
            checked_ratio(1.0, 0.0, "mean cpu"),
            Err(AnalysisError::DegenerateMean { ref label }) if label == "mean cpu"
        ));
    }

    #[test]
    fn test_filter_drops_negative_outlier_and_keeps_order() {
        let memory = Series::new(
            "par_memory",
            Some(Approach::ParallelJoin),
            Metric::Memory,
            vec![12.0, 11.5, -480.0, 12.4, 11.9, 12.1, 12.2, 11.8, 12.3, 12.0],
        );
        let threshold = quantile(&memory.values, 0.1).unwrap();
        let filtered = filter_outliers_below_percentile(&memory, 0.1).unwrap();

        let expected: Vec<f64> = memory.values.iter().copied().filter(|v| *v >= threshold).collect();
        assert_eq!(filtered.values, expected);
        assert_eq!(filtered.values, vec![12.0, 11.5, 12.4, 11.9, 12.1, 12.2, 11.8, 12.3, 12.0]);
        assert_eq!(filtered.label, "par_memory");
    }

    #[test]
    fn test_filter_is_not_applied_by_summarize() {
        let memory = series(&[10.0, -100.0, 10.0]);
        let summary = summarize(&memory).unwrap();
        assert_relative_eq!(summary.min, -100.0);
    }

    #[test]
    fn test_filter_empty_series() {
        assert!(matches!(
            filter_outliers_below_percentile(&series(&[]), 0.1),
            Err(AnalysisError::EmptySeries { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_summary_bounds(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..64)) {
            let summary = summarize(&series(&values)).unwrap();
            let tolerance = 1e-9 * (1.0 + summary.max.abs().max(summary.min.abs()));
            prop_assert!(summary.mean >= summary.min - tolerance);
            prop_assert!(summary.mean <= summary.max + tolerance);
            prop_assert!(summary.std >= 0.0);
            prop_assert!(summary.median >= summary.min - tolerance);
            prop_assert!(summary.median <= summary.max + tolerance);
            prop_assert!(summary.iqr >= 0.0);
        }

        #[test]
        fn prop_filter_keeps_subsequence(values in prop::collection::vec(-1.0e3f64..1.0e3, 1..64), p in 0.0f64..1.0) {
            let original = series(&values);
            let filtered = filter_outliers_below_percentile(&original, p).unwrap();
            let threshold = quantile(&values, p).unwrap();

            prop_assert!(filtered.values.iter().all(|v| *v >= threshold));
            let dropped = values.iter().filter(|v| **v < threshold).count();
            prop_assert_eq!(filtered.len() + dropped, values.len());

            // Kept values appear in their original relative order
            let mut cursor = values.iter();
            for kept in &filtered.values {
                prop_assert!(cursor.any(|v| v == kept));
            }
        }

        #[test]
        fn prop_histogram_total(values in prop::collection::vec(-50.0f64..50.0, 1..100), bins in 1usize..20) {
            let total: usize = histogram(&values, bins).iter().map(|b| b.count).sum();
            prop_assert_eq!(total, values.len());
        }
    }
}
