//! Curve channels: control points, spline construction and baked tables.

pub mod map;
pub mod point;
pub mod spline;
pub mod table;

pub use map::{ClipRect, CurveMap, CurvePreset};
pub use point::{CurvePoint, HandleType};
pub use spline::{Knot, SEGMENT_RESOLUTION, Spline};
pub use table::{
    BakedChannel, Extrapolation, GRADIENT_SENTINEL, RANGE_EPSILON, TABLE_SEGMENTS, TABLE_SIZE,
};
