//! Christoffersen (1998) conditional coverage test.
//!
//! `LR_cc = LR_uc + LR_ind`, where `LR_uc` is Kupiec's (1995)
//! proportion-of-failures statistic and `LR_ind` tests a first-order Markov
//! alternative against independent exceedances.

use super::base::{CalibrationTest, CalibrationTestKind, TestResult};
use crate::error::{QregvarError, Result};
use crate::utils::stats::{chi_square_sf, xlogy};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionalCoverage {
    pub observations: usize,
    pub exceedances: usize,
    /// Transition counts `n_ij`: exceedance state `i` followed by state `j`.
    pub n00: usize,
    pub n01: usize,
    pub n10: usize,
    pub n11: usize,
    pub lr_uc: f64,
    pub lr_ind: f64,
    pub lr_cc: f64,
    pub p_value_uc: f64,
    pub p_value_ind: f64,
    pub p_value_cc: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ConditionalCoverageTest;

impl ConditionalCoverageTest {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, hits: &[bool], alpha: f64) -> Result<ConditionalCoverage> {
        let n = hits.len();
        if n < 2 {
            return Err(QregvarError::DegenerateExceedanceSequence(format!(
                "conditional coverage needs at least 2 observations, got {}",
                n
            )));
        }
        let x = hits.iter().filter(|&&h| h).count();
        if x == 0 || x == n {
            return Err(QregvarError::DegenerateExceedanceSequence(format!(
                "{} exceedances in {} observations; transition matrix is not estimable",
                x, n
            )));
        }

        // Unconditional coverage
        let pi = x as f64 / n as f64;
        let ln_l0 = xlogy((n - x) as f64, 1.0 - alpha) + xlogy(x as f64, alpha);
        let ln_l1 = xlogy((n - x) as f64, 1.0 - pi) + xlogy(x as f64, pi);
        let lr_uc = (2.0 * (ln_l1 - ln_l0)).max(0.0);

        // Independence
        let mut n00 = 0usize;
        let mut n01 = 0usize;
        let mut n10 = 0usize;
        let mut n11 = 0usize;
        for pair in hits.windows(2) {
            match (pair[0], pair[1]) {
                (false, false) => n00 += 1,
                (false, true) => n01 += 1,
                (true, false) => n10 += 1,
                (true, true) => n11 += 1,
            }
        }

        let p01 = safe_prob(n01, n00 + n01);
        let p11 = safe_prob(n11, n10 + n11);
        let p1 = safe_prob(n01 + n11, n00 + n01 + n10 + n11);

        let ln_l0_ind = xlogy((n00 + n10) as f64, 1.0 - p1) + xlogy((n01 + n11) as f64, p1);
        let ln_l1_ind = xlogy(n00 as f64, 1.0 - p01)
            + xlogy(n01 as f64, p01)
            + xlogy(n10 as f64, 1.0 - p11)
            + xlogy(n11 as f64, p11);
        let lr_ind = (2.0 * (ln_l1_ind - ln_l0_ind)).max(0.0);

        let lr_cc = lr_uc + lr_ind;

        Ok(ConditionalCoverage {
            observations: n,
            exceedances: x,
            n00,
            n01,
            n10,
            n11,
            lr_uc,
            lr_ind,
            lr_cc,
            p_value_uc: chi_square_sf(lr_uc, 1.0),
            p_value_ind: chi_square_sf(lr_ind, 1.0),
            p_value_cc: chi_square_sf(lr_cc, 2.0),
        })
    }
}

impl CalibrationTest for ConditionalCoverageTest {
    fn name(&self) -> &str {
        "Conditional Coverage (Christoffersen)"
    }

    fn kind(&self) -> CalibrationTestKind {
        CalibrationTestKind::ConditionalCoverage
    }

    fn run(&self, hits: &[bool], _var_forecasts: &[f64], alpha: f64) -> Result<TestResult> {
        let cc = self.evaluate(hits, alpha)?;
        Ok(TestResult {
            test_name: self.name().to_string(),
            kind: self.kind(),
            statistic: cc.lr_cc,
            degrees_of_freedom: 2.0,
            p_value: cc.p_value_cc,
            details: json!({
                "observations": cc.observations,
                "exceedances": cc.exceedances,
                "transitions": [[cc.n00, cc.n01], [cc.n10, cc.n11]],
                "lr_uc": cc.lr_uc,
                "lr_ind": cc.lr_ind,
                "p_value_uc": cc.p_value_uc,
                "p_value_ind": cc.p_value_ind,
            }),
        })
    }
}

fn safe_prob(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transition_counts() {
        let hits = [false, true, true, false, false, true];
        let cc = ConditionalCoverageTest::new().evaluate(&hits, 0.05).unwrap();
        assert_eq!((cc.n00, cc.n01, cc.n10, cc.n11), (1, 2, 1, 1));
        assert_eq!(cc.exceedances, 3);
        assert_relative_eq!(cc.lr_cc, cc.lr_uc + cc.lr_ind, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_rate_has_zero_uc_statistic() {
        let mut hits = vec![false; 100];
        for i in [10, 30, 50, 70, 90] {
            hits[i] = true;
        }
        let cc = ConditionalCoverageTest::new().evaluate(&hits, 0.05).unwrap();
        assert_relative_eq!(cc.lr_uc, 0.0, epsilon = 1e-10);
        assert_relative_eq!(cc.p_value_uc, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_sequences_are_degenerate() {
        let test = ConditionalCoverageTest::new();
        for hits in [vec![false; 50], vec![true; 50], vec![true]] {
            assert!(matches!(
                test.evaluate(&hits, 0.05),
                Err(QregvarError::DegenerateExceedanceSequence(_))
            ));
        }
    }
}
