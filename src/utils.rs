/// Axis-aligned regions and points
pub mod region;
