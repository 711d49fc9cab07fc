use crate::kernels;
use crate::matching;
use crate::tracker;
use crate::utils;

pub use kernels::cache::{KernelCache, KernelSetParams};
pub use matching::{DistanceCaps, MatchingAlgorithm};
pub use tracker::{Location, Slot, Tracker, TrackerOptions};
pub use utils::region::{Point2D, Region};
