//! RGB Curves: four channels over (0,0)-(1,1) applied to r, g, b, a.

use curvenode_core::{CurveMapping, EvalConfig, apply_color4};
use curvenode_gpu::{GpuMaterial, ShaderVariant, link_curves};
use glam::Vec4;

use crate::error::NodeError;
use crate::multi_function::CurveFunction;
use crate::node::{NodeDeclaration, ShaderNode, SocketDecl, check_gpu_inputs, check_inputs};
use crate::stack::{SocketType, StackValue};

pub const RGB_CURVES_NAME: &str = "RGB Curves";

#[derive(Debug, Clone)]
pub struct RgbCurvesNode {
    mapping: CurveMapping,
}

impl RgbCurvesNode {
    /// Node creation hook: a fresh 4-channel mapping.
    pub fn new() -> Self {
        Self {
            mapping: CurveMapping::color(),
        }
    }

    /// Wrap an existing mapping, which must have all four channels.
    pub fn from_mapping(mapping: CurveMapping) -> Result<Self, NodeError> {
        if mapping.channel_count() != 4 {
            tracing::warn!(
                channels = mapping.channel_count(),
                "RGB Curves given a mapping without an alpha channel"
            );
            return Err(NodeError::ChannelCount {
                node: RGB_CURVES_NAME,
                expected: 4,
                got: mapping.channel_count(),
            });
        }
        Ok(Self { mapping })
    }

    /// Bake the mapping and build the "Curve RGB" function.
    pub fn multi_function(&self, config: EvalConfig) -> CurveFunction<Vec4> {
        CurveFunction::rgb(&self.mapping, config)
    }
}

impl Default for RgbCurvesNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderNode for RgbCurvesNode {
    fn name(&self) -> &'static str {
        RGB_CURVES_NAME
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
                    name: "Color",
                    ty: SocketType::Rgba,
                    default: StackValue::Rgba(Vec4::new(0.0, 0.0, 0.0, 1.0)),
                },
            ],
            outputs: vec![SocketDecl {
                name: "Color",
                ty: SocketType::Rgba,
                default: StackValue::Rgba(Vec4::new(0.0, 0.0, 0.0, 1.0)),
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
        let inputs = check_inputs(RGB_CURVES_NAME, inputs, 2)?;
        let fac = inputs[0].as_float();
        let color = inputs[1].as_color();
        Ok(vec![StackValue::Rgba(apply_color4(&self.mapping, fac, color))])
    }

    fn gpu(
        &self,
        material: &mut dyn GpuMaterial,
        inputs: &[&str],
        output: &str,
    ) -> Result<ShaderVariant, NodeError> {
        let (fac, value) = check_gpu_inputs(RGB_CURVES_NAME, inputs)?;
        Ok(link_curves(material, &self.mapping, fac, value, output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_hook_layout() {
        let node = RgbCurvesNode::new();
        assert_eq!(node.mapping().channel_count(), 4);
        let decl = node.declaration();
        assert_eq!(
            decl.default_inputs(),
            vec![
                StackValue::Float(1.0),
                StackValue::Rgba(Vec4::new(0.0, 0.0, 0.0, 1.0))
            ]
        );
    }

    #[test]
    fn test_from_mapping_requires_alpha() {
        assert!(matches!(
            RgbCurvesNode::from_mapping(CurveMapping::vector()),
            Err(NodeError::ChannelCount { expected: 4, got: 3, .. })
        ));
        assert!(RgbCurvesNode::from_mapping(CurveMapping::color()).is_ok());
    }

    #[test]
    fn test_exec_default_inputs() {
        let node = RgbCurvesNode::new();
        let out = node.exec(&node.declaration().default_inputs()).unwrap();
        match out[0] {
            StackValue::Rgba(c) => {
                assert!((c - Vec4::new(0.0, 0.0, 0.0, 1.0)).abs().max_element() < 1e-5)
            }
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn test_exec_promotes_float_color() {
        let mut node = RgbCurvesNode::new();
        node.mapping_mut().insert_point(1, 0.5, 0.9).unwrap();
        let out = node
            .exec(&[StackValue::Float(1.0), StackValue::Float(0.5)])
            .unwrap();
        let StackValue::Rgba(c) = out[0] else {
            panic!("expected a color");
        };
        assert!((c.x - 0.5).abs() < 1e-5);
        assert!(c.y > 0.8);
        assert!((c.w - 1.0).abs() < 1e-5);
    }
}
