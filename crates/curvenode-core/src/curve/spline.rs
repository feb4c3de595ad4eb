//! Bézier spline construction through curve control points.
//!
//! Every control point gets an incoming and an outgoing handle; consecutive
//! points form cubic Bézier segments that are sampled into a dense polyline.
//! The polyline is what the lookup table is resampled from.
//!
//! # Algorithm
//! For a point P with neighbours A (previous) and B (next), missing
//! neighbours are mirrored through P. With `da = P − A`, `db = B − P`:
//! ```text
//! auto:    t = db/|db| + da/|da|,  L = |t| × 2.5614
//!          h_in  = P − t × |da|/L,  h_out = P + t × |db|/L
//! vector:  h_in  = P − da/3,        h_out = P + db/3
//! ```
//! Handles of a segment are shortened when their x extents overlap so the
//! segment stays monotonic in x.
//!
//! # Complexity
//! - Handle resolution: O(N)
//! - Sampling: O(N × SEGMENT_RESOLUTION)

use glam::Vec2;

use super::point::{CurvePoint, HandleType};

/// Samples per Bézier segment, endpoints included.
pub const SEGMENT_RESOLUTION: usize = 32;

/// Divisor applied to the auto-handle bisector length.
const AUTO_HANDLE_SCALE: f32 = 2.5614;

/// A control point with its resolved handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knot {
    pub handle_in: Vec2,
    pub point: Vec2,
    pub handle_out: Vec2,
}

/// Resolved Bézier spline through a channel's control points.
///
/// Control points must be sorted by x. An empty spline has no knots.
#[derive(Debug, Clone)]
pub struct Spline {
    knots: Vec<Knot>,
}

impl Spline {
    /// Resolve handles for `points`.
    pub fn from_points(points: &[CurvePoint]) -> Self {
        let mut knots: Vec<Knot> = points
            .iter()
            .enumerate()
            .map(|(i, cp)| {
                let prev = i.checked_sub(1).map(|j| points[j].position());
                let next = points.get(i + 1).map(CurvePoint::position);
                let (handle_in, handle_out) =
                    resolve_handles(prev, cp.position(), next, cp.handle);
                Knot {
                    handle_in,
                    point: cp.position(),
                    handle_out,
                }
            })
            .collect();

        // The outer auto handles aim at the neighbouring handle instead of
        // the mirrored neighbour point.
        if knots.len() > 2 {
            if points[0].handle == HandleType::Auto {
                let first = knots[0];
                let mut aim = knots[1].handle_in;
                aim.x = aim.x.max(first.point.x);
                if let Some((away, toward)) = reaim(first, aim, first.handle_out) {
                    knots[0].handle_in = away;
                    knots[0].handle_out = toward;
                }
            }
            let last_idx = knots.len() - 1;
            if points[last_idx].handle == HandleType::Auto {
                let last = knots[last_idx];
                let mut aim = knots[last_idx - 1].handle_out;
                aim.x = aim.x.min(last.point.x);
                if let Some((away, toward)) = reaim(last, aim, last.handle_in) {
                    knots[last_idx].handle_in = toward;
                    knots[last_idx].handle_out = away;
                }
            }
        }

        Self { knots }
    }

    pub fn knots(&self) -> &[Knot] {
        &self.knots
    }

    /// Unit direction of the first point's incoming handle.
    pub fn ext_in(&self) -> Vec2 {
        match self.knots.first() {
            Some(k) => (k.handle_in - k.point).normalize_or(Vec2::NEG_X),
            None => Vec2::new(-1.0, -1.0).normalize(),
        }
    }

    /// Unit direction of the last point's outgoing handle.
    pub fn ext_out(&self) -> Vec2 {
        match self.knots.last() {
            Some(k) => (k.handle_out - k.point).normalize_or(Vec2::X),
            None => Vec2::ONE.normalize(),
        }
    }

    /// Sample every segment into a polyline ordered by x.
    ///
    /// A single-knot spline yields that one point; an empty spline yields
    /// nothing.
    pub fn sample(&self) -> Vec<Vec2> {
        if self.knots.len() < 2 {
            return self.knots.iter().map(|k| k.point).collect();
        }

        let mut samples = Vec::with_capacity((self.knots.len() - 1) * SEGMENT_RESOLUTION);
        for pair in self.knots.windows(2) {
            let p0 = pair[0].point;
            let p3 = pair[1].point;
            let (h1, h2) = monotonic_handles(p0, pair[0].handle_out, pair[1].handle_in, p3);
            for i in 0..SEGMENT_RESOLUTION {
                let t = i as f32 / (SEGMENT_RESOLUTION - 1) as f32;
                samples.push(cubic_bezier(p0, h1, h2, p3, t));
            }
        }
        samples
    }
}

fn resolve_handles(
    prev: Option<Vec2>,
    p: Vec2,
    next: Option<Vec2>,
    handle: HandleType,
) -> (Vec2, Vec2) {
    let (a, b) = match (prev, next) {
        (Some(a), Some(b)) => (a, b),
        (None, Some(b)) => (2.0 * p - b, b),
        (Some(a), None) => (a, 2.0 * p - a),
        // Lone point: flat handles.
        (None, None) => return (p - Vec2::X, p + Vec2::X),
    };

    let da = p - a;
    let db = b - p;

    match handle {
        HandleType::Auto => {
            let len_a = nonzero(da.length());
            let len_b = nonzero(db.length());
            let t = db / len_b + da / len_a;
            let len = t.length() * AUTO_HANDLE_SCALE;
            if len == 0.0 {
                return (p, p);
            }
            (p - t * (len_a / len), p + t * (len_b / len))
        }
        HandleType::Vector => (p - da / 3.0, p + db / 3.0),
    }
}

fn nonzero(len: f32) -> f32 {
    if len == 0.0 { 1.0 } else { len }
}

/// Point the handle pair of `knot` along `aim`, keeping the length of
/// `reference`. Returns `(away, toward)`.
fn reaim(knot: Knot, aim: Vec2, reference: Vec2) -> Option<(Vec2, Vec2)> {
    let hlen = (reference - knot.point).length();
    let dir = aim - knot.point;
    let nlen = dir.length();
    if nlen <= f32::EPSILON {
        return None;
    }
    let v = dir * (hlen / nlen);
    Some((knot.point - v, knot.point + v))
}

/// Shorten both inner handles of a segment when their x extents together
/// exceed the segment width.
fn monotonic_handles(p0: Vec2, h1: Vec2, h2: Vec2, p3: Vec2) -> (Vec2, Vec2) {
    let d1 = p0 - h1;
    let d2 = p3 - h2;
    let width = p3.x - p0.x;
    let len1 = d1.x.abs();
    let len2 = d2.x.abs();
    if len1 + len2 == 0.0 || len1 + len2 <= width {
        return (h1, h2);
    }
    let fac = width / (len1 + len2);
    (p0 - fac * d1, p3 - fac * d2)
}

fn cubic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}
