pub mod quantile_regression;
pub mod solver;

pub use quantile_regression::QuantileRegression;
pub use solver::{check_loss, design_rank, QuantileSolver, SimplexSolver};
