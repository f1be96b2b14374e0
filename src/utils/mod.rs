pub mod stats;

pub use stats::{chi_square_sf, empirical_quantile, pinball_loss};
