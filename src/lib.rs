pub mod domain;
pub mod kernel;
pub mod lowrank;
pub mod sampling;
mod utils;

pub use lowrank::{LowRankFactorization, RandomizedEigen};
pub use sampling::{PointSampler, SampleSet, WeightedPoint};
pub use utils::cumulative_search;
