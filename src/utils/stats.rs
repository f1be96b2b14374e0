//! Small numeric helpers shared by the forecasting and backtest engines.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Empirical `p`-quantile with linear interpolation between order statistics
/// (position `h = (n - 1) p`, the default convention of R and numpy).
///
/// Returns `None` for an empty sample or `p` outside `[0, 1]`.
pub fn empirical_quantile(sample: &[f64], p: f64) -> Option<f64> {
    if sample.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }

    let rank = p * (sorted.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        let w = rank - lo as f64;
        Some(sorted[lo] + w * (sorted[hi] - sorted[lo]))
    }
}

/// Pinball (check) loss `rho_alpha(u) = u (alpha - 1{u < 0})`.
pub fn pinball_loss(u: f64, alpha: f64) -> f64 {
    if u < 0.0 {
        u * (alpha - 1.0)
    } else {
        u * alpha
    }
}

/// Survival function of the chi-square distribution, `P(X > statistic)`.
///
/// Backed by the regularized incomplete gamma in `statrs`, accurate to roughly
/// 1e-10 relative over the range of statistics produced by the backtests.
/// Returns NaN for non-finite statistics or a non-positive `dof`.
pub fn chi_square_sf(statistic: f64, dof: f64) -> f64 {
    if !statistic.is_finite() {
        return f64::NAN;
    }
    match ChiSquared::new(dof) {
        Ok(chi) => chi.sf(statistic.max(0.0)),
        Err(_) => f64::NAN,
    }
}

/// Log-likelihood term `x ln(y)`, taken as zero when `x == 0` (so `0 ln 0 = 0`).
pub fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantile_interpolates() {
        let sample = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert_eq!(empirical_quantile(&sample, 0.0), Some(1.0));
        assert_eq!(empirical_quantile(&sample, 1.0), Some(5.0));
        assert_eq!(empirical_quantile(&sample, 0.5), Some(3.0));
        // h = 4 * 0.1 = 0.4 -> 1 + 0.4 * (2 - 1)
        assert_relative_eq!(empirical_quantile(&sample, 0.1).unwrap(), 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_quantile_edge_cases() {
        assert_eq!(empirical_quantile(&[], 0.5), None);
        assert_eq!(empirical_quantile(&[1.0], 1.5), None);
        assert_eq!(empirical_quantile(&[7.0], 0.05), Some(7.0));
    }

    #[test]
    fn test_pinball_is_asymmetric() {
        assert_relative_eq!(pinball_loss(2.0, 0.05), 0.1, epsilon = 1e-12);
        assert_relative_eq!(pinball_loss(-2.0, 0.05), 1.9, epsilon = 1e-12);
        assert_eq!(pinball_loss(0.0, 0.3), 0.0);
    }

    #[test]
    fn test_chi_square_reference_values() {
        // 95th percentiles of chi2(1) and chi2(2)
        assert_relative_eq!(chi_square_sf(3.841_458_820_694_124, 1.0), 0.05, epsilon = 1e-9);
        assert_relative_eq!(chi_square_sf(5.991_464_547_107_979, 2.0), 0.05, epsilon = 1e-9);
        // chi2(2) survival is exp(-x / 2)
        assert_relative_eq!(chi_square_sf(10.0, 2.0), (-5.0f64).exp(), epsilon = 1e-10);
        assert_relative_eq!(chi_square_sf(0.0, 2.0), 1.0, epsilon = 1e-12);
        assert!(chi_square_sf(f64::NAN, 2.0).is_nan());
    }
}
