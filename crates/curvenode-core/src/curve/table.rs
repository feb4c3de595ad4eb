//! Baked lookup tables and the normalized-domain evaluation shared by every
//! backend.
//!
//! A channel is baked into `TABLE_SIZE` equidistant samples over
//! `[min_table, max_table]`. Evaluation maps the input into the normalized
//! domain `t = (x − min_table) × range` and then either interpolates the
//! table (`0 ≤ t ≤ 1`) or extends it along the boundary gradient:
//! ```text
//! t < 0:  y = table[0]    + t × in_gradient
//! t > 1:  y = table[last] + (t − 1) × out_gradient
//! ```
//! The GPU snippets in `curvenode-gpu` implement the identical formula from
//! the same `range` and gradient values, so the CPU and GPU paths agree.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::point::CurvePoint;
use super::spline::Spline;

/// Number of table intervals.
pub const TABLE_SEGMENTS: usize = 256;

/// Number of table samples (`TABLE_SEGMENTS + 1`, both ends included).
pub const TABLE_SIZE: usize = TABLE_SEGMENTS + 1;

/// Floor for the table width before taking its reciprocal.
pub const RANGE_EPSILON: f32 = 1e-8;

/// Gradient used when a boundary tangent is vertical.
pub const GRADIENT_SENTINEL: f32 = 1e8;

/// Behaviour of a channel outside its authored domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extrapolation {
    /// Hold the boundary value.
    #[default]
    Clamp,
    /// Continue along the boundary tangent.
    Extrapolate,
}

/// `1 / max(ε, max − min)`. Finite for any finite domain, including a
/// zero-width one.
pub fn range_scale(min_table: f32, max_table: f32) -> f32 {
    1.0 / RANGE_EPSILON.max(max_table - min_table)
}

/// Slope of `tangent` expressed in the normalized domain.
///
/// A zero x component yields [`GRADIENT_SENTINEL`]; a quotient that
/// overflows is replaced by the sentinel with the quotient's sign.
pub fn extension_gradient(tangent: Vec2, range: f32) -> f32 {
    if tangent.x == 0.0 {
        return GRADIENT_SENTINEL;
    }
    let gradient = tangent.y / (tangent.x * range);
    if gradient.is_finite() {
        gradient
    } else {
        GRADIENT_SENTINEL.copysign(gradient)
    }
}

/// Immutable baked state of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BakedChannel {
    /// First table x.
    pub min_table: f32,
    /// Last table x.
    pub max_table: f32,
    /// Reciprocal table width, see [`range_scale`].
    pub range: f32,
    /// Unit direction of the first point's incoming handle.
    pub ext_in: Vec2,
    /// Unit direction of the last point's outgoing handle.
    pub ext_out: Vec2,
    /// Normalized-domain gradient below the table, zero when clamping.
    pub in_gradient: f32,
    /// Normalized-domain gradient above the table, zero when clamping.
    pub out_gradient: f32,
    pub extrapolation: Extrapolation,
    table: Vec<f32>,
}

impl BakedChannel {
    /// Build the table for `points` (sorted by x).
    ///
    /// An empty point list bakes the identity over `[0, 1]`.
    pub fn bake(points: &[CurvePoint], extrapolation: Extrapolation) -> Self {
        let spline = Spline::from_points(points);
        let samples = spline.sample();

        let (min_table, max_table, table) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => {
                let min_table = first.x;
                let max_table = last.x.max(min_table);
                (min_table, max_table, resample(&samples, min_table, max_table))
            }
            _ => {
                let ramp = (0..TABLE_SIZE)
                    .map(|i| i as f32 / TABLE_SEGMENTS as f32)
                    .collect();
                (0.0, 1.0, ramp)
            }
        };

        let range = range_scale(min_table, max_table);
        let ext_in = spline.ext_in();
        let ext_out = spline.ext_out();
        let (in_gradient, out_gradient) = match extrapolation {
            Extrapolation::Clamp => (0.0, 0.0),
            Extrapolation::Extrapolate => (
                extension_gradient(ext_in, range),
                extension_gradient(ext_out, range),
            ),
        };

        Self {
            min_table,
            max_table,
            range,
            ext_in,
            ext_out,
            in_gradient,
            out_gradient,
            extrapolation,
            table,
        }
    }

    /// The `TABLE_SIZE` samples, monotonically indexed by x.
    pub fn table(&self) -> &[f32] {
        &self.table
    }

    /// GPU extension tuple `(min_table, in_gradient, max_table, out_gradient)`.
    pub fn ext_uniform(&self) -> [f32; 4] {
        [
            self.min_table,
            self.in_gradient,
            self.max_table,
            self.out_gradient,
        ]
    }

    /// Evaluate the channel at `x`.
    pub fn evaluate(&self, x: f32) -> f32 {
        let t = (x - self.min_table) * self.range;
        if t < 0.0 {
            return match self.extrapolation {
                Extrapolation::Clamp => self.table[0],
                Extrapolation::Extrapolate => extend_edge(self.table[0], t, self.in_gradient),
            };
        }
        if t > 1.0 {
            return match self.extrapolation {
                Extrapolation::Clamp => self.table[TABLE_SEGMENTS],
                Extrapolation::Extrapolate => {
                    extend_edge(self.table[TABLE_SEGMENTS], t - 1.0, self.out_gradient)
                }
            };
        }
        let fi = t * TABLE_SEGMENTS as f32;
        let i = (fi as usize).min(TABLE_SEGMENTS - 1);
        let f = fi - i as f32;
        (1.0 - f) * self.table[i] + f * self.table[i + 1]
    }
}

/// `edge + dt * gradient`, holding the edge for a flat gradient so an
/// overflowing `dt` cannot produce `inf * 0`.
fn extend_edge(edge: f32, dt: f32, gradient: f32) -> f32 {
    if gradient == 0.0 { edge } else { edge + dt * gradient }
}

/// Resample an x-ordered polyline at `TABLE_SIZE` equidistant positions.
fn resample(samples: &[Vec2], min_table: f32, max_table: f32) -> Vec<f32> {
    let step = (max_table - min_table) / TABLE_SEGMENTS as f32;
    let mut table = Vec::with_capacity(TABLE_SIZE);
    let mut j = 0;

    for a in 0..TABLE_SIZE {
        let x = if a == TABLE_SEGMENTS {
            max_table
        } else {
            min_table + step * a as f32
        };
        // First sample strictly right of x.
        while j < samples.len() && samples[j].x <= x {
            j += 1;
        }
        let y = if j == 0 {
            samples[0].y
        } else if j == samples.len() {
            samples[j - 1].y
        } else {
            let lo = samples[j - 1];
            let hi = samples[j];
            let width = hi.x - lo.x;
            let fac = if width > f32::EPSILON {
                (hi.x - x) / width
            } else {
                0.0
            };
            fac * lo.y + (1.0 - fac) * hi.y
        };
        table.push(y);
    }

    table
}
