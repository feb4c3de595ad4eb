//! curvenode core: curve mapping evaluation for the Vector and RGB Curves
//! nodes.
//!
//! This crate owns the curve data model, the table bake, per-element
//! evaluation and the masked batch evaluator. No GPU or node-graph
//! dependencies.

pub mod batch;
pub mod config;
pub mod curve;
pub mod error;
pub mod evaluate;
pub mod mapping;

// Re-exports for convenience.
pub use batch::{BatchEvaluator, CurveElement, IndexMask, VArray};
pub use config::EvalConfig;
pub use curve::{
    BakedChannel, ClipRect, CurveMap, CurvePoint, CurvePreset, Extrapolation, GRADIENT_SENTINEL,
    HandleType, RANGE_EPSILON, TABLE_SEGMENTS, TABLE_SIZE,
};
pub use error::CurveError;
pub use evaluate::{
    apply_color4, apply_vector3, blend3, blend4, evaluate_color4, evaluate_premultiplied_rgb,
    evaluate_vector3,
};
pub use mapping::{BakedMapping, COLOR_CLIP, CurveMapping, VECTOR_CLIP};
