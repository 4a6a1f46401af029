//! Small numeric kernels shared by the query operations.
//!
//! Every function takes already-filtered values: absent measurements never
//! reach this module.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Percentile of ascending-sorted values using linear interpolation between
/// the order statistics at rank `p / 100 * (n - 1)`.
pub fn percentile_sorted(sorted: &[f64], percentile: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&percentile) {
        return None;
    }

    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn sorted_copy(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.into_iter().collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub enum PearsonOutcome {
    Coefficient(f64),
    TooFewPairs(usize),
    ZeroVariance,
}

/// Pearson correlation of paired observations.
pub fn pearson(pairs: &[(f64, f64)]) -> PearsonOutcome {
    if pairs.len() < 2 {
        return PearsonOutcome::TooFewPairs(pairs.len());
    }

    // Decided on the observations: a constant series can still leave
    // rounding residue in the sums of squares
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|(x, _)| *x == x0) || pairs.iter().all(|(_, y)| *y == y0) {
        return PearsonOutcome::ZeroVariance;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return PearsonOutcome::ZeroVariance;
    }

    PearsonOutcome::Coefficient((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        let std = sample_std(&values).unwrap();
        assert!((std - 2.138089935).abs() < 1e-6);

        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&sorted, 100.0), Some(4.0));
        assert_eq!(percentile_sorted(&sorted, 50.0), Some(2.5));
        // rank 0.75 * 3 = 2.25
        assert_eq!(percentile_sorted(&sorted, 75.0), Some(3.25));

        assert_eq!(percentile_sorted(&[7.0], 90.0), Some(7.0));
        assert_eq!(percentile_sorted(&[], 50.0), None);
        assert_eq!(percentile_sorted(&sorted, 101.0), None);
    }

    #[test]
    fn test_pearson() {
        let perfect = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        assert!(matches!(pearson(&perfect), PearsonOutcome::Coefficient(r) if (r - 1.0).abs() < 1e-12));

        let inverse = [(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)];
        assert!(matches!(pearson(&inverse), PearsonOutcome::Coefficient(r) if (r + 1.0).abs() < 1e-12));

        assert!(matches!(pearson(&[(1.0, 1.0)]), PearsonOutcome::TooFewPairs(1)));
        assert!(matches!(
            pearson(&[(1.0, 5.0), (2.0, 5.0)]),
            PearsonOutcome::ZeroVariance
        ));
    }

    #[test]
    fn test_pearson_constant_series_with_inexact_mean() {
        // 0.1 * 3 / 3 != 0.1 in binary, so the deviations are not exactly zero
        let pairs = [(1.0, 0.1), (2.0, 0.1), (3.0, 0.1)];
        assert!(matches!(pearson(&pairs), PearsonOutcome::ZeroVariance));

        let pairs = [(1.7, 4.0), (1.7, 9.0), (1.7, 2.5), (1.7, 8.0)];
        assert!(matches!(pearson(&pairs), PearsonOutcome::ZeroVariance));
    }
}
