pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod ml;
pub mod types;
pub mod utils;

pub use error::{QregvarError, Result};
