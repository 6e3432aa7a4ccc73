//! Coördinaten, coördinatenstelsels en de transformaties daartussen.

pub mod parameter_coord;
pub mod system;
pub mod transform;

pub use parameter_coord::{AXIS_TAGS, CoordError, CoordEvaluationError, ParameterCoord};
pub use system::CoordinateSystem;
pub use transform::transform_coords;
