//! Control points and handle types.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// How the Bézier handles of a control point are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleType {
    /// Smooth: handles follow the bisector of the neighbouring directions.
    #[default]
    Auto,
    /// Sharp corner: each handle points a third of the way to its neighbour.
    Vector,
}

/// A single authored control point of a curve channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub handle: HandleType,
}

impl CurvePoint {
    /// Auto-handle point at `(x, y)`.
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            handle: HandleType::Auto,
        }
    }

    /// Vector-handle point at `(x, y)`.
    pub const fn sharp(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            handle: HandleType::Vector,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<[f32; 2]> for CurvePoint {
    fn from(p: [f32; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}
