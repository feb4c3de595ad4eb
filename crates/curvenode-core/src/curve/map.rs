//! One channel of a curve mapping: authored points plus editing operations.

use serde::{Deserialize, Serialize};

use super::point::{CurvePoint, HandleType};
use super::table::{BakedChannel, Extrapolation};
use crate::error::CurveError;

/// Rectangle bounding the editable area of a mapping.
///
/// Fixed when the mapping is created; its corners seed the default
/// straight-line channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl ClipRect {
    pub const UNIT: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Reject rectangles that are non-finite or inverted on either axis.
    pub fn validate(&self) -> Result<(), CurveError> {
        let finite = [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if finite && self.min_x <= self.max_x && self.min_y <= self.max_y {
            Ok(())
        } else {
            Err(CurveError::InvalidClip {
                min_x: self.min_x,
                min_y: self.min_y,
                max_x: self.max_x,
                max_y: self.max_y,
            })
        }
    }

    /// Map unit-square coordinates into the rectangle.
    fn lerp(&self, u: f32, v: f32) -> CurvePoint {
        CurvePoint::new(
            self.min_x + (self.max_x - self.min_x) * u,
            self.min_y + (self.max_y - self.min_y) * v,
        )
    }

    fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x.clamp(self.min_x, self.max_x),
            y.clamp(self.min_y, self.max_y),
        )
    }
}

impl Default for ClipRect {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Built-in channel shapes, laid out in the unit square and scaled into the
/// clip rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurvePreset {
    /// Diagonal from the bottom-left to the top-right corner.
    Line,
    /// Soft falloff from top-left to bottom-right.
    Smooth,
    /// Steep falloff from top-left to bottom-right.
    Sharp,
    /// Constant at the top edge.
    Max,
    /// Constant at mid height.
    Mid,
}

impl CurvePreset {
    fn unit_points(self) -> &'static [[f32; 2]] {
        match self {
            Self::Line => &[[0.0, 0.0], [1.0, 1.0]],
            Self::Smooth => &[[0.0, 1.0], [0.25, 0.94], [0.75, 0.06], [1.0, 0.0]],
            Self::Sharp => &[[0.0, 1.0], [0.25, 0.5], [0.75, 0.04], [1.0, 0.0]],
            Self::Max => &[[0.0, 1.0], [1.0, 1.0]],
            Self::Mid => &[[0.0, 0.5], [1.0, 0.5]],
        }
    }
}

/// A single channel's piecewise spline.
///
/// Points are kept sorted with strictly increasing x. The baked table for
/// the channel lives in the owning [`CurveMapping`](crate::CurveMapping)'s
/// cache and is rebuilt from these points on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveMap {
    points: Vec<CurvePoint>,
    #[serde(default)]
    extrapolation: Extrapolation,
}

impl CurveMap {
    /// Create a channel from arbitrary points. Points are sorted by x;
    /// duplicate or non-finite coordinates are rejected.
    pub fn new(points: impl IntoIterator<Item = CurvePoint>) -> Result<Self, CurveError> {
        let mut points: Vec<CurvePoint> = points.into_iter().collect();
        if let Some(p) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(CurveError::NonFinite(p.x, p.y));
        }
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        if let Some(pair) = points.windows(2).find(|w| w[0].x == w[1].x) {
            return Err(CurveError::DuplicateX(pair[0].x));
        }
        Ok(Self {
            points,
            extrapolation: Extrapolation::Clamp,
        })
    }

    /// Channel reset to `preset` inside `clip`.
    pub fn from_preset(preset: CurvePreset, clip: &ClipRect) -> Self {
        Self {
            points: preset
                .unit_points()
                .iter()
                .map(|[u, v]| clip.lerp(*u, *v))
                .collect(),
            extrapolation: Extrapolation::Clamp,
        }
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn extrapolation(&self) -> Extrapolation {
        self.extrapolation
    }

    pub(crate) fn set_extrapolation(&mut self, extrapolation: Extrapolation) {
        self.extrapolation = extrapolation;
    }

    /// True when the channel is exactly the two-point line (0,0)-(1,1).
    pub fn is_unit_identity(&self) -> bool {
        matches!(
            self.points.as_slice(),
            [a, b] if a.x == 0.0 && a.y == 0.0 && b.x == 1.0 && b.y == 1.0
        )
    }

    /// Insert a point, keeping x order. Returns its index.
    pub fn insert_point(&mut self, x: f32, y: f32) -> Result<usize, CurveError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(CurveError::NonFinite(x, y));
        }
        match self.points.binary_search_by(|p| p.x.total_cmp(&x)) {
            Ok(_) => Err(CurveError::DuplicateX(x)),
            Err(index) => {
                self.points.insert(index, CurvePoint::new(x, y));
                Ok(index)
            }
        }
    }

    /// Remove the point at `index`. A channel keeps at least two points.
    pub fn remove_point(&mut self, index: usize) -> Result<CurvePoint, CurveError> {
        self.check_index(index)?;
        if self.points.len() <= 2 {
            return Err(CurveError::TooFewPoints);
        }
        Ok(self.points.remove(index))
    }

    /// Move the point at `index` to `(x, y)`, re-sorting. Returns the new
    /// index of the point.
    pub fn move_point(&mut self, index: usize, x: f32, y: f32) -> Result<usize, CurveError> {
        self.check_index(index)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(CurveError::NonFinite(x, y));
        }
        if self
            .points
            .iter()
            .enumerate()
            .any(|(i, p)| i != index && p.x == x)
        {
            return Err(CurveError::DuplicateX(x));
        }
        let mut moved = self.points.remove(index);
        moved.x = x;
        moved.y = y;
        let at = self.points.partition_point(|p| p.x < x);
        self.points.insert(at, moved);
        Ok(at)
    }

    pub fn set_handle(&mut self, index: usize, handle: HandleType) -> Result<(), CurveError> {
        self.check_index(index)?;
        self.points[index].handle = handle;
        Ok(())
    }

    /// Replace the points with `preset` inside `clip`.
    pub fn reset(&mut self, preset: CurvePreset, clip: &ClipRect) {
        let extrapolation = self.extrapolation;
        *self = Self::from_preset(preset, clip);
        self.extrapolation = extrapolation;
    }

    /// Clamp every point into `clip`. Points whose x collapses onto a
    /// neighbour are dropped, keeping the first.
    pub fn clip_to(&mut self, clip: &ClipRect) {
        for p in &mut self.points {
            (p.x, p.y) = clip.clamp(p.x, p.y);
        }
        self.points.dedup_by(|b, a| a.x == b.x);
    }

    /// Bake this channel's lookup table.
    pub fn bake(&self) -> BakedChannel {
        BakedChannel::bake(&self.points, self.extrapolation)
    }

    fn check_index(&self, index: usize) -> Result<(), CurveError> {
        if index < self.points.len() {
            Ok(())
        } else {
            Err(CurveError::PointIndex {
                index,
                len: self.points.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_points() {
        let map = CurveMap::new([CurvePoint::new(1.0, 1.0), CurvePoint::new(0.0, 0.0)]).unwrap();
        assert_eq!(map.points()[0].x, 0.0);
        assert!(map.is_unit_identity());
    }

    #[test]
    fn test_new_rejects_duplicate_and_nan() {
        let dup = CurveMap::new([CurvePoint::new(0.5, 0.0), CurvePoint::new(0.5, 1.0)]);
        assert!(matches!(dup, Err(CurveError::DuplicateX(_))));
        let nan = CurveMap::new([CurvePoint::new(f32::NAN, 0.0)]);
        assert!(matches!(nan, Err(CurveError::NonFinite(..))));
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut map = CurveMap::from_preset(CurvePreset::Line, &ClipRect::UNIT);
        assert_eq!(map.insert_point(0.5, 0.8).unwrap(), 1);
        assert_eq!(map.insert_point(0.25, 0.1).unwrap(), 1);
        let xs: Vec<f32> = map.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 1.0]);
        assert!(matches!(map.insert_point(0.5, 0.0), Err(CurveError::DuplicateX(_))));
    }

    #[test]
    fn test_remove_keeps_two_points() {
        let mut map = CurveMap::from_preset(CurvePreset::Line, &ClipRect::UNIT);
        assert!(matches!(map.remove_point(0), Err(CurveError::TooFewPoints)));
        assert!(matches!(
            map.remove_point(7),
            Err(CurveError::PointIndex { index: 7, len: 2 })
        ));
        map.insert_point(0.5, 0.5).unwrap();
        assert_eq!(map.remove_point(1).unwrap().x, 0.5);
    }

    #[test]
    fn test_move_point_resorts() {
        let mut map = CurveMap::from_preset(CurvePreset::Smooth, &ClipRect::UNIT);
        let at = map.move_point(1, 0.9, 0.2).unwrap();
        assert_eq!(at, 2);
        let xs: Vec<f32> = map.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 0.75, 0.9, 1.0]);
        assert!(!map.is_unit_identity());
    }

    #[test]
    fn test_preset_scales_into_clip() {
        let clip = ClipRect::new(-1.0, -1.0, 1.0, 1.0);
        let map = CurveMap::from_preset(CurvePreset::Line, &clip);
        assert_eq!(map.points()[0].position(), glam::Vec2::new(-1.0, -1.0));
        assert_eq!(map.points()[1].position(), glam::Vec2::new(1.0, 1.0));
        assert!(!map.is_unit_identity());
    }

    #[test]
    fn test_clip_to_clamps_and_dedups() {
        let mut map = CurveMap::new([
            CurvePoint::new(-2.0, 0.0),
            CurvePoint::new(-1.5, 3.0),
            CurvePoint::new(0.5, 0.5),
        ])
        .unwrap();
        map.clip_to(&ClipRect::UNIT);
        assert_eq!(map.points().len(), 2);
        assert_eq!(map.points()[0].position(), glam::Vec2::new(0.0, 0.0));
    }
}
