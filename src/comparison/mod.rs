//! Pairwise comparison of two strategies measured over the same iterations.

use log::debug;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::dataset::{Metric, Series};
use crate::error::{AnalysisError, Result};
use crate::statistics::{checked_ratio, mean, sample_variance, summarize, Summary};

/// p-values below this are reported as significant.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;
/// p-values below this are reported as highly significant.
pub const HIGH_SIGNIFICANCE_LEVEL: f64 = 0.001;
/// Two-sided 95% normal quantile used for the mean-difference interval.
const Z_95: f64 = 1.96;

/// Cohen's d magnitude classes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectSize {
    Small,
    Medium,
    Large,
}

impl EffectSize {
    pub fn classify(d: f64) -> Self {
        let d = d.abs();
        if d >= 0.8 {
            EffectSize::Large
        } else if d >= 0.5 {
            EffectSize::Medium
        } else {
            EffectSize::Small
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffectSize::Small => "Small",
            EffectSize::Medium => "Medium",
            EffectSize::Large => "Large",
        }
    }
}

/// Which side of the ratio is credited with a win when `a / b > 1`.
///
/// The benchmark reports disagree on this, so each analysis picks its own.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinConvention {
    /// `a / b > 1` counts as a win for `a`.
    NumeratorWins,
    /// `a / b > 1` counts as a win for `b` (b took less time).
    DenominatorWins,
}

/// Per-iteration split of speedup ratios around 1.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinTally {
    pub ratio_above_one: usize,
    pub ratio_at_or_below_one: usize,
}

impl WinTally {
    pub fn from_ratios(ratios: &[f64]) -> Self {
        let above = ratios.iter().filter(|&&r| r > 1.0).count();
        WinTally {
            ratio_above_one: above,
            ratio_at_or_below_one: ratios.len() - above,
        }
    }

    pub fn total(&self) -> usize {
        self.ratio_above_one + self.ratio_at_or_below_one
    }

    /// `(wins for a, wins for b)` under the given convention.
    pub fn credited(&self, convention: WinConvention) -> (usize, usize) {
        match convention {
            WinConvention::NumeratorWins => (self.ratio_above_one, self.ratio_at_or_below_one),
            WinConvention::DenominatorWins => (self.ratio_at_or_below_one, self.ratio_above_one),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    pub center: f64,
    pub margin: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Result of comparing two paired series of the same metric.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Comparison {
    pub label_a: String,
    pub label_b: String,
    pub name_a: String,
    pub name_b: String,
    pub metric: Metric,
    pub n: usize,
    pub mean_a: f64,
    pub mean_b: f64,
    pub mean_difference: f64,
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    pub significant: bool,
    pub cohens_d: f64,
    pub effect_size: EffectSize,
    /// 95% interval of `mean_a - mean_b`.
    pub confidence_interval: ConfidenceInterval,
    /// `a[i] / b[i]` for every iteration.
    pub ratios: Vec<f64>,
    pub ratio_summary: Summary,
    pub tally: WinTally,
}

impl Comparison {
    pub fn significance_wording(&self) -> &'static str {
        if self.p_value < HIGH_SIGNIFICANCE_LEVEL {
            "Highly significant difference"
        } else if self.p_value < SIGNIFICANCE_LEVEL {
            "Significant difference"
        } else {
            "No significant difference"
        }
    }

    /// Ratio series labelled for charts and summaries.
    pub fn ratio_series(&self) -> Series {
        Series::new(
            format!("{} / {}", self.label_a, self.label_b),
            None,
            Metric::Ratio,
            self.ratios.clone(),
        )
    }
}

fn check_paired(a: &Series, b: &Series, minimum: usize) -> Result<()> {
    if a.len() != b.len() || a.len() < minimum {
        return Err(AnalysisError::MismatchedLength {
            left: a.label.clone(),
            right: b.label.clone(),
            left_len: a.len(),
            right_len: b.len(),
        });
    }
    Ok(())
}

/// Compares two paired series: paired t-test, Cohen's d, 95% interval of
/// the mean difference, speedup ratios and win tally.
pub fn compare(a: &Series, b: &Series) -> Result<Comparison> {
    check_paired(a, b, 2)?;

    let (t_statistic, degrees_of_freedom, p_value) = paired_t_test(&a.values, &b.values)?;
    let d = cohens_d(&a.values, &b.values);
    let ratios = speedup_ratios(a, b)?;

    let mean_a = a.values.iter().sum::<f64>() / a.len() as f64;
    let mean_b = b.values.iter().sum::<f64>() / b.len() as f64;
    let mean_difference = mean_a - mean_b;

    let margin = Z_95
        * (sample_variance(&a.values) / a.len() as f64 + sample_variance(&b.values) / b.len() as f64).sqrt();

    let ratio_label = format!("{} / {}", a.label, b.label);
    let ratio_summary = summarize(&Series::new(ratio_label, None, Metric::Ratio, ratios.clone()))?;

    let comparison = Comparison {
        label_a: a.label.clone(),
        label_b: b.label.clone(),
        name_a: a.display_name(),
        name_b: b.display_name(),
        metric: a.metric,
        n: a.len(),
        mean_a,
        mean_b,
        mean_difference,
        t_statistic,
        degrees_of_freedom,
        p_value,
        significant: p_value < SIGNIFICANCE_LEVEL,
        cohens_d: d,
        effect_size: EffectSize::classify(d),
        confidence_interval: ConfidenceInterval {
            center: mean_difference,
            margin,
            lower: mean_difference - margin,
            upper: mean_difference + margin,
        },
        tally: WinTally::from_ratios(&ratios),
        ratios,
        ratio_summary,
    };

    debug!(
        "{} vs {}: t={:.4} p={:.3e} d={:.4}",
        comparison.label_a, comparison.label_b, t_statistic, p_value, d
    );
    Ok(comparison)
}

/// Paired t-test. Returns `(t, degrees of freedom, two-tailed p)`.
///
/// When every difference is identical the standard error is zero: equal
/// series give `t = 0, p = 1`, a constant offset gives `t = ±inf, p = 0`.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> Result<(f64, f64, f64)> {
    let diff: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let n = diff.len() as f64;
    let df = n - 1.0;

    let mean_diff = mean(&diff).unwrap_or(0.0);
    let se = (sample_variance(&diff) / n).sqrt();

    if se == 0.0 {
        return Ok(if mean_diff == 0.0 {
            (0.0, df, 1.0)
        } else {
            (mean_diff.signum() * f64::INFINITY, df, 0.0)
        });
    }

    let t = mean_diff / se;
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| AnalysisError::Distribution {
        message: e.to_string(),
    })?;
    let p = (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0);

    Ok((t, df, p))
}

/// Cohen's d with the pooled standard deviation.
///
/// Zero pooled spread yields 0 for equal means and a signed infinity otherwise.
pub fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    let na = a.len() as f64;
    let nb = b.len() as f64;
    let mean_diff = mean(a).unwrap_or(0.0) - mean(b).unwrap_or(0.0);

    let pooled = (((na - 1.0) * sample_variance(a) + (nb - 1.0) * sample_variance(b)) / (na + nb - 2.0)).sqrt();

    if pooled == 0.0 || !pooled.is_finite() {
        return if mean_diff == 0.0 {
            0.0
        } else {
            mean_diff.signum() * f64::INFINITY
        };
    }
    mean_diff / pooled
}

/// Elementwise `a[i] / b[i]`. Aborts on the first zero in `b`.
pub fn speedup_ratios(a: &Series, b: &Series) -> Result<Vec<f64>> {
    check_paired(a, b, 0)?;

    a.values
        .iter()
        .zip(&b.values)
        .enumerate()
        .map(|(i, (x, y))| {
            if *y == 0.0 {
                Err(AnalysisError::DivideByZero {
                    label: format!("{} / {}", a.label, b.label),
                    index: i,
                })
            } else {
                Ok(x / y)
            }
        })
        .collect()
}

/// Per-iteration `(baseline - candidate) / baseline * 100`.
pub fn relative_improvement(baseline: &Series, candidate: &Series) -> Result<Vec<f64>> {
    let ratios = speedup_ratios(candidate, baseline)?;
    Ok(ratios.into_iter().map(|r| (1.0 - r) * 100.0).collect())
}

/// Per-iteration `part / whole * 100`.
pub fn share_percent(part: &Series, whole: &Series) -> Result<Vec<f64>> {
    Ok(speedup_ratios(part, whole)?.into_iter().map(|r| r * 100.0).collect())
}

/// Ratio of the means `a / b`.
pub fn mean_ratio(a: &Summary, b: &Summary) -> Result<f64> {
    checked_ratio(a.mean, b.mean, &format!("mean of {}", b.label))
}

/// `(baseline - candidate) / baseline * 100` on means.
pub fn percent_reduction(baseline: f64, candidate: f64, label: &str) -> Result<f64> {
    Ok(checked_ratio(baseline - candidate, baseline, label)? * 100.0)
}

/// Verifies a recorded ratio column against freshly computed ratios.
///
/// Returns the indices whose relative divergence exceeds `tolerance`.
pub fn divergent_ratios(recorded: &[f64], computed: &[f64], tolerance: f64) -> Vec<usize> {
    recorded
        .iter()
        .zip(computed)
        .enumerate()
        .filter(|(_, (r, c))| ((*r - *c) / c.abs().max(f64::EPSILON)).abs() > tolerance)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Strategy as Approach;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn super_times(values: &[f64]) -> Series {
        Series::new("super_time", Some(Approach::SuperQuery), Metric::ExecutionTime, values.to_vec())
    }

    fn parallel_times(values: &[f64]) -> Series {
        Series::new("par_total_time", Some(Approach::ParallelJoin), Metric::ExecutionTime, values.to_vec())
    }

    #[test]
    fn test_clear_separation() {
        let a = super_times(&[100.0, 110.0, 90.0, 105.0, 95.0]);
        let b = parallel_times(&[50.0, 55.0, 45.0, 52.0, 48.0]);
        let result = compare(&a, &b).unwrap();

        assert_relative_eq!(result.mean_a, 100.0);
        assert_relative_eq!(result.mean_b, 50.0);
        assert_relative_eq!(result.ratio_summary.mean, 2.0, epsilon = 0.01);
        assert!(result.p_value < SIGNIFICANCE_LEVEL);
        assert!(result.significant);
        assert_eq!(result.degrees_of_freedom, 4.0);
        // diff = [50, 55, 45, 53, 47]: mean 50, variance 17
        assert_relative_eq!(result.t_statistic, 50.0 / (17.0f64 / 5.0).sqrt(), epsilon = 1e-9);
        assert_eq!(result.effect_size, EffectSize::Large);
        assert_eq!(result.tally.ratio_above_one, 5);
        assert_eq!(result.tally.total(), 5);
        assert_eq!(result.significance_wording(), "Highly significant difference");
    }

    #[test]
    fn test_identical_series() {
        let a = super_times(&[10.0, 12.0, 11.0, 13.0]);
        let result = compare(&a, &parallel_times(&a.values)).unwrap();

        assert_relative_eq!(result.p_value, 1.0);
        assert_eq!(result.t_statistic, 0.0);
        assert_eq!(result.cohens_d, 0.0);
        assert_eq!(result.effect_size, EffectSize::Small);
        assert!(!result.significant);
        assert_eq!(result.tally.ratio_at_or_below_one, 4);
    }

    #[test]
    fn test_constant_offset_is_infinitely_significant() {
        let a = super_times(&[11.0, 12.0, 13.0]);
        let b = parallel_times(&[10.0, 11.0, 12.0]);
        let (t, df, p) = paired_t_test(&a.values, &b.values).unwrap();
        assert!(t.is_infinite() && t > 0.0);
        assert_eq!(df, 2.0);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_known_p_value() {
        // diff = [1, 2, 3]: mean 2, sd 1, t = 2 * sqrt(3), df = 2
        let (t, _, p) = paired_t_test(&[2.0, 4.0, 6.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(t, 2.0 * 3.0f64.sqrt(), epsilon = 1e-12);
        // Exact two-tailed p for t on 2 df: 1 - t / sqrt(t^2 + 2)
        assert_relative_eq!(p, 1.0 - t / (t * t + 2.0).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_mismatched_lengths() {
        let err = compare(&super_times(&[1.0, 2.0, 3.0]), &parallel_times(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MismatchedLength { left_len: 3, right_len: 2, .. }
        ));
    }

    #[test]
    fn test_single_pair_is_rejected() {
        let err = compare(&super_times(&[1.0]), &parallel_times(&[2.0])).unwrap_err();
        assert!(matches!(err, AnalysisError::MismatchedLength { .. }));
    }

    #[test]
    fn test_speedup_zero_denominator_aborts() {
        let err = speedup_ratios(&super_times(&[1.0, 2.0, 3.0]), &parallel_times(&[1.0, 0.0, 3.0])).unwrap_err();
        match err {
            AnalysisError::DivideByZero { label, index } => {
                assert_eq!(index, 1);
                assert_eq!(label, "super_time / par_total_time");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cohens_d_pooled() {
        // Equal variances (2.5) so pooled sd = sqrt(2.5)
        let d = cohens_d(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_relative_eq!(d, -1.0 / 2.5f64.sqrt(), epsilon = 1e-12);
        assert_eq!(EffectSize::classify(d), EffectSize::Medium);
        assert_eq!(EffectSize::classify(0.49), EffectSize::Small);
        assert_eq!(EffectSize::classify(-0.8), EffectSize::Large);
    }

    #[test]
    fn test_confidence_interval() {
        let a = super_times(&[100.0, 110.0, 90.0, 105.0, 95.0]);
        let b = parallel_times(&[50.0, 55.0, 45.0, 52.0, 48.0]);
        let ci = compare(&a, &b).unwrap().confidence_interval;

        let expected_margin = 1.96 * (62.5 / 5.0 + sample_variance(&b.values) / 5.0).sqrt();
        assert_relative_eq!(ci.center, 50.0, epsilon = 1e-9);
        assert_relative_eq!(ci.margin, expected_margin, epsilon = 1e-9);
        assert!(ci.lower < 50.0 && ci.upper > 50.0);
    }

    #[test]
    fn test_win_conventions() {
        let tally = WinTally::from_ratios(&[2.0, 0.5, 1.0, 3.0]);
        assert_eq!(tally.ratio_above_one, 2);
        assert_eq!(tally.ratio_at_or_below_one, 2);
        assert_eq!(tally.credited(WinConvention::NumeratorWins), (2, 2));

        let tally = WinTally::from_ratios(&[2.0, 3.0, 0.9]);
        assert_eq!(tally.credited(WinConvention::NumeratorWins), (2, 1));
        assert_eq!(tally.credited(WinConvention::DenominatorWins), (1, 2));
    }

    #[test]
    fn test_relative_improvement_and_share() {
        let baseline = super_times(&[100.0, 200.0]);
        let candidate = parallel_times(&[50.0, 150.0]);
        let improvement = relative_improvement(&baseline, &candidate).unwrap();
        assert_relative_eq!(improvement[0], 50.0, epsilon = 1e-12);
        assert_relative_eq!(improvement[1], 25.0, epsilon = 1e-12);

        let share = share_percent(&candidate, &baseline).unwrap();
        assert_relative_eq!(share[1], 75.0, epsilon = 1e-12);

        assert!(matches!(
            relative_improvement(&super_times(&[0.0]), &parallel_times(&[1.0])),
            Err(AnalysisError::DivideByZero { index: 0, .. })
        ));
    }

    #[test]
    fn test_percent_reduction_zero_baseline() {
        assert_relative_eq!(percent_reduction(200.0, 150.0, "cpu").unwrap(), 25.0);
        assert!(matches!(
            percent_reduction(0.0, 1.0, "cpu"),
            Err(AnalysisError::DegenerateMean { .. })
        ));
    }

    #[test]
    fn test_divergent_ratios() {
        let computed = [2.0, 1.5, 3.0];
        let recorded = [2.0, 1.8, 3.001];
        assert_eq!(divergent_ratios(&recorded, &computed, 0.01), vec![1]);
    }

    fn positive_pairs() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        (2usize..40).prop_flat_map(|n| {
            (
                prop::collection::vec(0.1f64..1.0e4, n),
                prop::collection::vec(0.1f64..1.0e4, n),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_ratios_are_reciprocal((a, b) in positive_pairs()) {
            let sa = super_times(&a);
            let sb = parallel_times(&b);
            let forward = speedup_ratios(&sa, &sb).unwrap();
            let backward = speedup_ratios(&sb, &sa).unwrap();
            for i in 0..a.len() {
                prop_assert!((forward[i] - a[i] / b[i]).abs() <= 1e-12 * forward[i].abs());
                prop_assert!((forward[i] * backward[i] - 1.0).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_tally_covers_every_iteration((a, b) in positive_pairs()) {
            let result = compare(&super_times(&a), &parallel_times(&b)).unwrap();
            prop_assert_eq!(result.tally.ratio_above_one + result.tally.ratio_at_or_below_one, a.len());
            prop_assert!((0.0..=1.0).contains(&result.p_value));
        }

        #[test]
        fn prop_identical_series_not_significant(a in prop::collection::vec(0.1f64..1.0e4, 2..40)) {
            let result = compare(&super_times(&a), &parallel_times(&a)).unwrap();
            prop_assert!((result.p_value - 1.0).abs() < 1e-12);
            prop_assert_eq!(result.cohens_d, 0.0);
        }
    }
}
