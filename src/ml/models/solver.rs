//! Exact linear-programming solvers for quantile regression.
//!
//! The check-loss objective `sum rho_alpha(y_i - x_i'b)` is convex and
//! piecewise linear. [`SimplexSolver`] works on its dual (Koenker's rank-score
//! form)
//!
//! ```text
//! max y'd   s.t.   X'd = 0,   alpha - 1 <= d_i <= alpha
//! ```
//!
//! with a bounded-variable simplex: phase one drives `p` artificial columns to
//! zero from a start that guesses each observation's side of the quantile,
//! phase two prices every observation. The coefficients are the simplex
//! multipliers, recovered by interpolating the `p` basic observations.
//! Optimality is certified by the reduced costs of all `n` observations, so
//! degenerate vertices (tied or zero returns) need no special casing. Pricing
//! is Dantzig's rule, switching to Bland's rule on runs of degenerate pivots.
//!
//! When the optimum is not unique, any optimal vertex may be returned. Two
//! correct solvers can therefore disagree on coefficients while reaching the
//! same objective value.

use crate::error::{QregvarError, Result};
use crate::utils::stats::{empirical_quantile, pinball_loss};
use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoff used for rank decisions.
const RANK_TOLERANCE: f64 = 1e-10;

/// Smallest basis-direction entry accepted as a pivot.
const PIVOT_TOLERANCE: f64 = 1e-11;

/// Phase one may leave at most this much artificial mass per observation and unit of `x`.
const FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Degenerate pivots tolerated (beyond `p`) before switching to Bland's rule.
const BLAND_AFTER: usize = 5;

pub trait QuantileSolver: Send + Sync {
    fn name(&self) -> &str;

    /// Minimize the check loss of `y - x b` at quantile `alpha`.
    ///
    /// Fails with `NonIdentifiableFit` when `x` does not have full column rank.
    fn solve(&self, x: &DMatrix<f64>, y: &DVector<f64>, alpha: f64) -> Result<DVector<f64>>;
}

/// Check-loss objective value at `beta`.
pub fn check_loss(x: &DMatrix<f64>, y: &DVector<f64>, beta: &DVector<f64>, alpha: f64) -> f64 {
    (y - x * beta).iter().map(|&u| pinball_loss(u, alpha)).sum()
}

/// Numerical rank of `x` from its singular values.
pub fn design_rank(x: &DMatrix<f64>) -> usize {
    if x.nrows() == 0 || x.ncols() == 0 {
        return 0;
    }
    let svd = x.clone().svd(false, false);
    let max_sv = svd.singular_values.max();
    if !(max_sv > 0.0) {
        return 0;
    }
    svd.singular_values
        .iter()
        .filter(|&&s| s > max_sv * RANK_TOLERANCE)
        .count()
}

#[derive(Debug, Clone)]
pub struct SimplexSolver {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for SimplexSolver {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-9,
        }
    }
}

impl SimplexSolver {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Default::default()
        }
    }
}

impl QuantileSolver for SimplexSolver {
    fn name(&self) -> &str {
        "simplex"
    }

    fn solve(&self, x: &DMatrix<f64>, y: &DVector<f64>, alpha: f64) -> Result<DVector<f64>> {
        let (n, p) = x.shape();
        if y.len() != n {
            return Err(QregvarError::Computation(format!(
                "Design has {} rows but response has {}",
                n,
                y.len()
            )));
        }
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(QregvarError::InvalidConfiguration(format!(
                "Quantile level must be in (0, 1), got {}",
                alpha
            )));
        }
        if p == 0 || n < p {
            return Err(QregvarError::NonIdentifiableFit(format!(
                "{} observations cannot identify {} coefficients",
                n, p
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(QregvarError::Computation(
                "Design or response contains non-finite values".to_string(),
            ));
        }

        let rank = design_rank(x);
        if rank < p {
            return Err(QregvarError::NonIdentifiableFit(format!(
                "Design matrix has rank {} < {} (collinear regressors)",
                rank, p
            )));
        }

        let mut simplex = DualSimplex::new(x, y, alpha, self.max_iterations);

        let phase_one_cost = DVector::from_fn(n + p, |j, _| if j < n { 0.0 } else { 1.0 });
        simplex.optimize(&phase_one_cost, self.tolerance)?;
        let infeasibility: f64 = (n..n + p).map(|a| simplex.value[a].abs()).sum();
        if infeasibility > FEASIBILITY_TOLERANCE * x.amax().max(1.0) * n as f64 {
            return Err(QregvarError::Computation(format!(
                "Simplex phase one stopped with infeasibility {:.3e}",
                infeasibility
            )));
        }
        simplex.retire_artificials()?;

        let phase_two_cost = DVector::from_fn(n + p, |j, _| if j < n { -y[j] } else { 0.0 });
        simplex.optimize(&phase_two_cost, self.tolerance * y.amax().max(1.0))?;
        log::trace!("Simplex converged after {} pivots", simplex.iterations);

        // The basic observations have zero residual at the optimum
        let y_basis = DVector::from_iterator(p, simplex.basis.iter().map(|&i| y[i]));
        select_rows(x, &simplex.basis)
            .lu()
            .solve(&y_basis)
            .ok_or_else(|| QregvarError::NonIdentifiableFit("Optimal basis is singular".to_string()))
    }
}

/// Bounded-variable simplex over the dual variables `d_0..d_n` followed by one
/// artificial column per constraint.
struct DualSimplex {
    /// Constraint matrix `[X' | diag(sign)]`, `p x (n + p)`.
    columns: DMatrix<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    value: Vec<f64>,
    /// Which bound a nonbasic variable sits at.
    at_upper: Vec<bool>,
    basis: Vec<usize>,
    row_of: Vec<Option<usize>>,
    observations: usize,
    iterations: usize,
    max_iterations: usize,
}

impl DualSimplex {
    fn new(x: &DMatrix<f64>, y: &DVector<f64>, alpha: f64, max_iterations: usize) -> Self {
        let (n, p) = x.shape();

        // Observations above the sample quantile start on the upper bound
        let threshold = empirical_quantile(y.as_slice(), alpha).unwrap_or(0.0);
        let mut at_upper: Vec<bool> = y.iter().map(|&v| v > threshold).collect();
        let mut value: Vec<f64> = at_upper
            .iter()
            .map(|&up| if up { alpha } else { alpha - 1.0 })
            .collect();
        let mut lower = vec![alpha - 1.0; n];
        let mut upper = vec![alpha; n];

        let imbalance = x.tr_mul(&DVector::from_column_slice(&value));
        let mut columns = DMatrix::zeros(p, n + p);
        for j in 0..n {
            for k in 0..p {
                columns[(k, j)] = x[(j, k)];
            }
        }
        for k in 0..p {
            columns[(k, n + k)] = if imbalance[k] > 0.0 { -1.0 } else { 1.0 };
            lower.push(0.0);
            upper.push(f64::INFINITY);
            at_upper.push(false);
            value.push(imbalance[k].abs());
        }

        let basis: Vec<usize> = (n..n + p).collect();
        let mut row_of = vec![None; n + p];
        for (r, &j) in basis.iter().enumerate() {
            row_of[j] = Some(r);
        }

        Self {
            columns,
            lower,
            upper,
            value,
            at_upper,
            basis,
            row_of,
            observations: n,
            iterations: 0,
            max_iterations,
        }
    }

    fn basis_inverse(&self) -> Result<DMatrix<f64>> {
        let p = self.basis.len();
        DMatrix::from_fn(p, p, |k, r| self.columns[(k, self.basis[r])])
            .try_inverse()
            .ok_or_else(|| QregvarError::NonIdentifiableFit("Simplex basis became singular".to_string()))
    }

    /// Recompute basic values from the nonbasic ones so rounding never accumulates.
    fn update_basic_values(&mut self, inverse: &DMatrix<f64>) {
        let mut rhs = DVector::zeros(self.basis.len());
        for (j, &v) in self.value.iter().enumerate() {
            if self.row_of[j].is_none() && v != 0.0 {
                rhs.axpy(-v, &self.columns.column(j), 1.0);
            }
        }
        let basic = inverse * rhs;
        for (r, &j) in self.basis.iter().enumerate() {
            self.value[j] = basic[r];
        }
    }

    fn choose_entering(&self, reduced: &DVector<f64>, tolerance: f64, bland: bool) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (j, &d) in reduced.iter().enumerate() {
            if self.row_of[j].is_some() || self.lower[j] == self.upper[j] {
                continue;
            }
            let gain = if self.at_upper[j] { d } else { -d };
            if gain <= tolerance {
                continue;
            }
            if bland {
                return Some(j);
            }
            if best.map_or(true, |(_, g)| gain > g) {
                best = Some((j, gain));
            }
        }
        best.map(|(j, _)| j)
    }

    /// Minimize `cost'v` until no nonbasic variable prices out.
    fn optimize(&mut self, cost: &DVector<f64>, tolerance: f64) -> Result<()> {
        let p = self.basis.len();
        let mut degenerate_run = 0usize;

        loop {
            if self.iterations >= self.max_iterations {
                return Err(QregvarError::Computation(format!(
                    "Simplex did not converge within {} iterations",
                    self.max_iterations
                )));
            }
            self.iterations += 1;

            let inverse = self.basis_inverse()?;
            self.update_basic_values(&inverse);

            let basic_cost = DVector::from_iterator(p, self.basis.iter().map(|&j| cost[j]));
            let multipliers = inverse.tr_mul(&basic_cost);
            let reduced = cost - self.columns.tr_mul(&multipliers);

            let bland = degenerate_run >= p + BLAND_AFTER;
            let entering = match self.choose_entering(&reduced, tolerance, bland) {
                Some(q) => q,
                None => return Ok(()),
            };

            // Ratio test: the entering variable may flip to its other bound
            // unless a basic variable hits a bound first (lowest index wins ties)
            let direction = if self.at_upper[entering] { -1.0 } else { 1.0 };
            let w = &inverse * self.columns.column(entering);
            let mut step = self.upper[entering] - self.lower[entering];
            let mut leaving: Option<(usize, bool)> = None;
            for r in 0..p {
                let delta = -direction * w[r];
                let j = self.basis[r];
                let (limit, to_upper) = if delta < -PIVOT_TOLERANCE {
                    ((self.value[j] - self.lower[j]) / -delta, false)
                } else if delta > PIVOT_TOLERANCE && self.upper[j].is_finite() {
                    ((self.upper[j] - self.value[j]) / delta, true)
                } else {
                    continue;
                };
                let limit = limit.max(0.0);
                let better = match leaving {
                    None => limit < step,
                    Some((row, _)) => limit < step || (limit == step && j < self.basis[row]),
                };
                if better {
                    step = limit;
                    leaving = Some((r, to_upper));
                }
            }

            if !step.is_finite() {
                return Err(QregvarError::Computation(
                    "Dual problem unbounded along entering column".to_string(),
                ));
            }
            degenerate_run = if step <= PIVOT_TOLERANCE { degenerate_run + 1 } else { 0 };

            match leaving {
                None => {
                    self.at_upper[entering] = !self.at_upper[entering];
                    self.value[entering] = if self.at_upper[entering] {
                        self.upper[entering]
                    } else {
                        self.lower[entering]
                    };
                }
                Some((r, to_upper)) => {
                    let out = self.basis[r];
                    self.row_of[out] = None;
                    self.at_upper[out] = to_upper;
                    self.value[out] = if to_upper { self.upper[out] } else { self.lower[out] };

                    self.value[entering] += direction * step;
                    self.basis[r] = entering;
                    self.row_of[entering] = Some(r);
                }
            }
        }
    }

    /// Fix the artificial columns at zero and pivot any still basic ones out.
    fn retire_artificials(&mut self) -> Result<()> {
        let n = self.observations;
        let total = self.value.len();

        for a in n..total {
            self.lower[a] = 0.0;
            self.upper[a] = 0.0;
            if self.row_of[a].is_none() {
                self.value[a] = 0.0;
                self.at_upper[a] = false;
            }
        }

        for a in n..total {
            let r = match self.row_of[a] {
                Some(r) => r,
                None => continue,
            };
            let row = self.basis_inverse()?.row(r).transpose();
            let replacement = (0..n)
                .filter(|&j| self.row_of[j].is_none())
                .map(|j| (j, row.dot(&self.columns.column(j)).abs()))
                .filter(|&(_, weight)| weight > PIVOT_TOLERANCE)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(j, _)| j)
                .ok_or_else(|| {
                    QregvarError::NonIdentifiableFit("Constraints are linearly dependent".to_string())
                })?;

            self.row_of[a] = None;
            self.value[a] = 0.0;
            self.at_upper[a] = false;
            self.basis[r] = replacement;
            self.row_of[replacement] = Some(r);
        }

        Ok(())
    }
}

fn select_rows(x: &DMatrix<f64>, rows: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), x.ncols(), |r, c| x[(rows[r], c)])
}
