//! Vector Curves: three channels over (-1,-1)-(1,1) applied to x, y, z.

use curvenode_core::{CurveMapping, EvalConfig, apply_vector3};
use curvenode_gpu::{GpuMaterial, ShaderVariant, link_curves};
use glam::Vec3;

use crate::error::NodeError;
use crate::multi_function::CurveFunction;
use crate::node::{NodeDeclaration, ShaderNode, SocketDecl, check_gpu_inputs, check_inputs};
use crate::stack::{SocketType, StackValue};

pub const VECTOR_CURVES_NAME: &str = "Vector Curves";

#[derive(Debug, Clone)]
pub struct VectorCurvesNode {
    mapping: CurveMapping,
}

impl VectorCurvesNode {
    /// Node creation hook: a fresh 3-channel mapping.
    pub fn new() -> Self {
        Self {
            mapping: CurveMapping::vector(),
        }
    }

    /// Wrap an existing mapping, which must have exactly three channels.
    pub fn from_mapping(mapping: CurveMapping) -> Result<Self, NodeError> {
        if mapping.channel_count() != 3 {
            tracing::warn!(
                channels = mapping.channel_count(),
                "Vector Curves given a mapping that is not 3-channel"
            );
            return Err(NodeError::ChannelCount {
                node: VECTOR_CURVES_NAME,
                expected: 3,
                got: mapping.channel_count(),
            });
        }
        Ok(Self { mapping })
    }

    /// Bake the mapping and build the "Curve Vec" function.
    pub fn multi_function(&self, config: EvalConfig) -> CurveFunction<Vec3> {
        CurveFunction::vector(&self.mapping, config)
    }
}

impl Default for VectorCurvesNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderNode for VectorCurvesNode {
    fn name(&self) -> &'static str {
        VECTOR_CURVES_NAME
    }

    fn declaration(&self) -> NodeDeclaration {
        NodeDeclaration {
            inputs: vec![
                SocketDecl {
                    name: "Fac",
                    ty: SocketType::Float,
                    default: StackValue::Float(1.0),
                },
                SocketDecl {
                    name: "Vector",
                    ty: SocketType::Vector,
                    default: StackValue::Vector(Vec3::ZERO),
                },
            ],
            outputs: vec![SocketDecl {
                name: "Vector",
                ty: SocketType::Vector,
                default: StackValue::Vector(Vec3::ZERO),
            }],
        }
    }

    fn mapping(&self) -> &CurveMapping {
        &self.mapping
    }

    fn mapping_mut(&mut self) -> &mut CurveMapping {
        &mut self.mapping
    }

    fn exec(&self, inputs: &[StackValue]) -> Result<Vec<StackValue>, NodeError> {
        let inputs = check_inputs(VECTOR_CURVES_NAME, inputs, 2)?;
        let fac = inputs[0].as_float();
        let v = inputs[1].as_vector();
        Ok(vec![StackValue::Vector(apply_vector3(&self.mapping, fac, v))])
    }

    fn gpu(
        &self,
        material: &mut dyn GpuMaterial,
        inputs: &[&str],
        output: &str,
    ) -> Result<ShaderVariant, NodeError> {
        let (fac, value) = check_gpu_inputs(VECTOR_CURVES_NAME, inputs)?;
        Ok(link_curves(material, &self.mapping, fac, value, output)?)
    }
}
