//! curvenode nodes: the Vector Curves and RGB Curves shader nodes.
//!
//! Each node owns one [`CurveMapping`](curvenode_core::CurveMapping) and
//! exposes it through three adapters: interpreted stack evaluation
//! ([`ShaderNode::exec`]), the vectorized [`MultiFunction`] and GPU material
//! linking ([`ShaderNode::gpu`]).

pub mod error;
pub mod multi_function;
pub mod node;
pub mod rgb_curves;
pub mod stack;
pub mod vector_curves;

pub use error::NodeError;
pub use multi_function::{
    CurveFunction, MFInput, MFOutput, MFParams, MultiFunction, ParamDecl, ParamKind, Signature,
};
pub use node::{NodeDeclaration, ShaderNode, SocketDecl};
pub use rgb_curves::{RGB_CURVES_NAME, RgbCurvesNode};
pub use stack::{SocketType, StackValue};
pub use vector_curves::{VECTOR_CURVES_NAME, VectorCurvesNode};
