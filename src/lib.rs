pub mod field;
pub mod kernels;
pub mod matching;
pub mod prelude;
pub mod tracker;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Errors {
    #[error("Region must have positive finite extents, got {0} x {1}.")]
    DegenerateRegion(f32, f32),
    #[error("Suppression field dimensions must be positive, got {0} x {1}.")]
    InvalidFieldDimensions(usize, usize),
    #[error("Distance bucket boundaries must be positive and strictly increasing.")]
    InvalidBucketBoundaries,
    #[error("Score noise width must be finite and non-negative, got {0}.")]
    InvalidNoiseWidth(f32),
}

pub(crate) const EPS: f32 = 0.00001;
