//! Small numeric helpers shared by the strategies.

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation; `None` for an empty slice.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Smallest and largest value; `None` for an empty slice.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(values.iter().fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

/// Rounds to two decimal places (currency).
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds to four decimal places (rates and weights).
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Splits `total` by `weights` into cent-rounded shares that sum to `total`.
///
/// Rounding drift is absorbed by the share with the largest weight.
pub fn allocate(total: f64, weights: &[f64]) -> Vec<f64> {
    let mut shares: Vec<f64> = weights.iter().map(|w| round_cents(total * w)).collect();
    let drift = round_cents(total - shares.iter().sum::<f64>());
    if drift != 0.0 {
        let largest = weights
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((i, w)),
            });
        if let Some((i, _)) = largest {
            shares[i] = round_cents(shares[i] + drift);
        }
    }
    shares
}

/// True if every value is finite.
pub fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ratio_guards_zero() {
        assert_eq!(safe_ratio(40.0, 0.0), 0.0);
        assert_eq!(safe_ratio(40.0, 100.0), 0.4);
    }

    #[test]
    fn test_mean_and_spread() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[100.0, 200.0, 300.0]), Some(200.0));
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(2.0));
        assert_eq!(min_max(&[120.0, 100.0, 140.0]), Some((100.0, 140.0)));
        assert_eq!(min_max(&[]), None);
    }

    #[test]
    fn test_allocate_sums_to_total() {
        let shares = allocate(1000.0, &[0.25, 0.75]);
        assert_eq!(shares, vec![250.0, 750.0]);

        let thirds = allocate(100.0, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        assert!((thirds.iter().sum::<f64>() - 100.0).abs() < 1e-9);
    }
}
