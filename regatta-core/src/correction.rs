//! Batch-level corrections: Benjamini-Hochberg false-discovery-rate
//! adjustment across a family of p-values, and ratio-based effect-size
//! confidence intervals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::descriptive::t_critical_value;

/// Canonical ordering for a comparison pair key, so `(A, B)` and `(B, A)`
/// collide to one entry.
pub fn normalize_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Benjamini-Hochberg FDR adjustment.
///
/// Keys are opaque; comparison pairs should be normalized with
/// [`normalize_pair`] first so `(A, B)` and `(B, A)` share one entry. Input
/// p-values are clamped to `[0, 1]` (NaN clamps to 1) before processing.
/// Entries are sorted ascending by p-value and
/// `q(i) = min over j >= i of (m / rank(j)) * p(j)`, capped at 1, with
/// monotonicity enforced by scanning from the largest rank down. An empty
/// input yields an empty map.
pub fn benjamini_hochberg<K: Ord + Clone>(p_values: &BTreeMap<K, f64>) -> BTreeMap<K, f64> {
    if p_values.is_empty() {
        return BTreeMap::new();
    }

    let m = p_values.len() as f64;
    let mut entries: Vec<(&K, f64)> = p_values
        .iter()
        .map(|(key, &p)| {
            let p = if p.is_nan() { 1.0 } else { p.clamp(0.0, 1.0) };
            (key, p)
        })
        .collect();
    entries.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut q_values = vec![0.0; entries.len()];
    let mut running_min = 1.0_f64;
    for (idx, (_, p)) in entries.iter().enumerate().rev() {
        let rank = (idx + 1) as f64;
        running_min = running_min.min((m / rank) * p).min(1.0);
        q_values[idx] = running_min;
    }

    entries
        .into_iter()
        .zip(q_values)
        .map(|((key, _), q)| (key.clone(), q))
        .collect()
}

/// Ratio of two means with a confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioCi {
    /// mean_b / mean_a.
    pub ratio: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Confidence interval for the ratio `mean_b / mean_a` via the log-scale
/// delta method, with a Student's t critical value at
/// `min(n_a, n_b) - 1` degrees of freedom (floored at 1).
///
/// The interval is undefined when either mean is non-positive (the log
/// transform does not exist) or when both standard errors are zero; those
/// cases return the point ratio with `None` bounds.
#[allow(clippy::too_many_arguments)]
pub fn ratio_ci(
    mean_a: f64,
    se_a: f64,
    n_a: usize,
    mean_b: f64,
    se_b: f64,
    n_b: usize,
    confidence_level: f64,
) -> RatioCi {
    let ratio = mean_b / mean_a;

    if mean_a <= 0.0 || mean_b <= 0.0 || (se_a == 0.0 && se_b == 0.0) {
        return RatioCi {
            ratio,
            lower: None,
            upper: None,
        };
    }

    let df = n_a.min(n_b).saturating_sub(1).max(1) as f64;
    let t = t_critical_value(confidence_level, df);

    // Var(ln ratio) ~ (se_a / mean_a)^2 + (se_b / mean_b)^2
    let log_variance = (se_a / mean_a).powi(2) + (se_b / mean_b).powi(2);
    let half_width = t * log_variance.sqrt();

    RatioCi {
        ratio,
        lower: Some(ratio * (-half_width).exp()),
        upper: Some(ratio * half_width.exp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pmap(entries: &[((&str, &str), f64)]) -> BTreeMap<(String, String), f64> {
        entries
            .iter()
            .map(|((a, b), p)| ((a.to_string(), b.to_string()), *p))
            .collect()
    }

    #[test]
    fn test_normalize_pair_symmetry() {
        assert_eq!(normalize_pair("run-a", "run-b"), normalize_pair("run-b", "run-a"));
        assert_eq!(
            normalize_pair("zzz", "aaa"),
            ("aaa".to_string(), "zzz".to_string())
        );
    }

    #[test]
    fn test_empty_input_yields_empty_map() {
        let adjusted = benjamini_hochberg(&BTreeMap::<(String, String), f64>::new());
        assert!(adjusted.is_empty());
    }

    #[test]
    fn test_single_p_value_unchanged() {
        let input = pmap(&[(("a", "b"), 0.03)]);
        let adjusted = benjamini_hochberg(&input);
        let q = adjusted[&("a".to_string(), "b".to_string())];
        assert!((q - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_known_adjustment() {
        // p = [0.01, 0.02, 0.03, 0.04] with m = 4:
        // raw m/rank * p = [0.04, 0.04, 0.04, 0.04], all monotone.
        let input = pmap(&[
            (("a", "b"), 0.01),
            (("a", "c"), 0.02),
            (("a", "d"), 0.03),
            (("b", "c"), 0.04),
        ]);
        let adjusted = benjamini_hochberg(&input);
        for q in adjusted.values() {
            assert!((q - 0.04).abs() < 1e-12);
        }
    }

    #[test]
    fn test_q_at_least_p() {
        let input = pmap(&[
            (("a", "b"), 0.001),
            (("a", "c"), 0.2),
            (("a", "d"), 0.5),
            (("b", "c"), 0.9),
        ]);
        let adjusted = benjamini_hochberg(&input);
        for (key, &p) in &input {
            assert!(adjusted[key] >= p);
        }
    }

    #[test]
    fn test_monotone_in_rank() {
        let input = pmap(&[
            (("a", "b"), 0.005),
            (("a", "c"), 0.011),
            (("a", "d"), 0.02),
            (("b", "c"), 0.8),
        ]);
        let adjusted = benjamini_hochberg(&input);

        let mut pairs: Vec<(f64, f64)> = input
            .iter()
            .map(|(key, &p)| (p, adjusted[key]))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        for window in pairs.windows(2) {
            assert!(window[0].1 <= window[1].1);
        }
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let input = pmap(&[(("a", "b"), -0.5), (("a", "c"), 1.5), (("a", "d"), f64::NAN)]);
        let adjusted = benjamini_hochberg(&input);
        for q in adjusted.values() {
            assert!((0.0..=1.0).contains(q));
        }
    }

    #[test]
    fn test_ratio_ci_identical_means() {
        let ci = ratio_ci(10.0, 1.0, 30, 10.0, 1.0, 30, 0.95);

        assert!((ci.ratio - 1.0).abs() < 1e-12);
        let lower = ci.lower.unwrap();
        let upper = ci.upper.unwrap();
        assert!(lower < 1.0);
        assert!(upper > 1.0);
        // Log-symmetric around the ratio.
        assert!((lower * upper - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_ci_non_positive_mean() {
        let ci = ratio_ci(0.0, 1.0, 30, 10.0, 1.0, 30, 0.95);
        assert!(ci.lower.is_none());
        assert!(ci.upper.is_none());
    }

    #[test]
    fn test_ratio_ci_zero_standard_errors() {
        let ci = ratio_ci(10.0, 0.0, 30, 20.0, 0.0, 30, 0.95);
        assert!((ci.ratio - 2.0).abs() < 1e-12);
        assert!(ci.lower.is_none());
        assert!(ci.upper.is_none());
    }

    #[test]
    fn test_ratio_ci_df_floor() {
        // n = 1 on one side floors the degrees of freedom at 1 instead of 0.
        let ci = ratio_ci(10.0, 1.0, 1, 10.0, 1.0, 30, 0.95);
        assert!(ci.lower.is_some());
        assert!(ci.upper.is_some());
    }
}
