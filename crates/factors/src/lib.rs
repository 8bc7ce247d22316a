//! Factor computation from ordered snapshot windows.
//!
//! Every calculator is a pure function of its window. Missing history
//! propagates as `None`, never as a neutral zero. All momentum, percentile,
//! funding, basis, and divergence outputs are fractions (0.05 means 5%).

pub mod carry;
pub mod composite;
pub mod engine;
pub mod mean_reversion;
pub mod momentum;
pub mod outlier;
pub mod stats;
pub mod volume;
pub mod window;

pub use engine::FactorEngine;
pub use outlier::{classify_outliers, OutlierType};
pub use window::SnapshotWindow;
