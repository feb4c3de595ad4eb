//! Pure per-element evaluation of a baked mapping, plus the factor blend.
//!
//! Every backend funnels through these functions: the interpreted node
//! adapter calls [`apply_vector3`] / [`apply_color4`] once per tick and the
//! batch evaluator calls the same evaluate and blend pair per mask index.

use glam::{Vec3, Vec4};

use crate::mapping::{BakedMapping, CurveMapping};

/// Channels 0, 1, 2 applied to x, y, z.
#[inline]
pub fn evaluate_vector3(baked: &BakedMapping, v: Vec3) -> Vec3 {
    Vec3::new(
        baked.channel(0).evaluate(v.x),
        baked.channel(1).evaluate(v.y),
        baked.channel(2).evaluate(v.z),
    )
}

/// Channels 0..3 applied to r, g, b, a.
///
/// A 3-channel mapping passes alpha through unchanged.
#[inline]
pub fn evaluate_color4(baked: &BakedMapping, c: Vec4) -> Vec4 {
    let alpha = baked
        .channels()
        .get(3)
        .map_or(c.w, |channel| channel.evaluate(c.w));
    Vec4::new(
        baked.channel(0).evaluate(c.x),
        baked.channel(1).evaluate(c.y),
        baked.channel(2).evaluate(c.z),
        alpha,
    )
}

/// R, G, B normalized by the mapping's black/white levels before lookup.
pub fn evaluate_premultiplied_rgb(mapping: &CurveMapping, rgb: Vec3) -> Vec3 {
    let baked = mapping.ensure_baked();
    let black = Vec3::from_array(mapping.black_level());
    let bwmul = Vec3::from_array(mapping.bwmul());
    evaluate_vector3(&baked, (rgb - black) * bwmul)
}

/// `lerp(input, evaluated, fac)`, returning `evaluated` untouched at
/// `fac == 1`.
#[inline]
pub fn blend3(input: Vec3, evaluated: Vec3, fac: f32) -> Vec3 {
    if fac == 1.0 {
        evaluated
    } else {
        input.lerp(evaluated, fac)
    }
}

/// Four-component [`blend3`].
#[inline]
pub fn blend4(input: Vec4, evaluated: Vec4, fac: f32) -> Vec4 {
    if fac == 1.0 {
        evaluated
    } else {
        input.lerp(evaluated, fac)
    }
}

/// Evaluate and blend a single vector.
pub fn apply_vector3(mapping: &CurveMapping, fac: f32, v: Vec3) -> Vec3 {
    let baked = mapping.ensure_baked();
    blend3(v, evaluate_vector3(&baked, v), fac)
}

/// Evaluate and blend a single color.
pub fn apply_color4(mapping: &CurveMapping, fac: f32, c: Vec4) -> Vec4 {
    let baked = mapping.ensure_baked();
    blend4(c, evaluate_color4(&baked, c), fac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::table::Extrapolation;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-5;

    fn lifted() -> CurveMapping {
        let mut mapping = CurveMapping::color();
        mapping.insert_point(0, 0.5, 0.8).unwrap();
        mapping.insert_point(3, 0.5, 0.2).unwrap();
        mapping
    }

    #[test]
    fn test_identity_mapping_is_identity() {
        let baked = CurveMapping::color().ensure_baked();
        let c = Vec4::new(0.1, 0.5, 0.9, 0.3);
        let out = evaluate_color4(&baked, c);
        assert_abs_diff_eq!(out, c, epsilon = EPSILON);
    }

    #[test]
    fn test_vector_mapping_spans_minus_one_to_one() {
        let baked = CurveMapping::vector().ensure_baked();
        let v = Vec3::new(-0.75, 0.0, 0.5);
        assert_abs_diff_eq!(evaluate_vector3(&baked, v), v, epsilon = EPSILON);
        // Clamped at the clip edge.
        let out = evaluate_vector3(&baked, Vec3::splat(3.0));
        assert_abs_diff_eq!(out, Vec3::ONE, epsilon = EPSILON);
    }

    #[test]
    fn test_alpha_uses_channel_three() {
        let baked = lifted().ensure_baked();
        let out = evaluate_color4(&baked, Vec4::splat(0.5));
        assert!(out.x > 0.7);
        assert!(out.w < 0.3);
        assert_abs_diff_eq!(out.y, 0.5, epsilon = EPSILON);
    }

    #[test]
    fn test_blend_endpoints_are_exact() {
        let input = Vec4::new(0.2, 0.4, 0.6, 1.0);
        let evaluated = Vec4::new(0.123_456_7, 0.9, 0.01, 0.5);
        assert_eq!(blend4(input, evaluated, 1.0), evaluated);
        assert_eq!(blend4(input, evaluated, 0.0), input);
        assert_eq!(blend3(input.truncate(), evaluated.truncate(), 1.0), evaluated.truncate());
        assert_eq!(blend3(input.truncate(), evaluated.truncate(), 0.0), input.truncate());
    }

    #[test]
    fn test_blend_midpoint() {
        let out = blend3(Vec3::ZERO, Vec3::ONE, 0.25);
        assert_abs_diff_eq!(out, Vec3::splat(0.25), epsilon = EPSILON);
    }

    #[test]
    fn test_apply_matches_manual_blend() {
        let mapping = lifted();
        let c = Vec4::new(0.5, 0.25, 0.75, 0.5);
        let baked = mapping.ensure_baked();
        let expected = blend4(c, evaluate_color4(&baked, c), 0.6);
        assert_eq!(apply_color4(&mapping, 0.6, c), expected);
    }

    #[test]
    fn test_extrapolation_flag_reaches_evaluation() {
        let mut mapping = CurveMapping::color();
        assert_abs_diff_eq!(apply_color4(&mapping, 1.0, Vec4::splat(2.0)).x, 1.0, epsilon = EPSILON);
        mapping.set_extend(Extrapolation::Extrapolate);
        assert_abs_diff_eq!(apply_color4(&mapping, 1.0, Vec4::splat(2.0)).x, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_premultiplied_normalizes_levels() {
        let mut mapping = CurveMapping::color();
        mapping.set_black_white([0.2; 3], [0.7; 3]);
        let out = evaluate_premultiplied_rgb(&mapping, Vec3::new(0.2, 0.45, 0.7));
        assert_abs_diff_eq!(out, Vec3::new(0.0, 0.5, 1.0), epsilon = 1e-4);
    }
}
