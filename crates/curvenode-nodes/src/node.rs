//! Node declarations and the interface shared by the curve nodes.

use curvenode_core::CurveMapping;
use curvenode_gpu::{GpuMaterial, ShaderVariant};

use crate::error::NodeError;
use crate::stack::{SocketType, StackValue};

/// One input or output socket.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketDecl {
    pub name: &'static str,
    pub ty: SocketType,
    /// Value used when the socket is unlinked.
    pub default: StackValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDeclaration {
    pub inputs: Vec<SocketDecl>,
    pub outputs: Vec<SocketDecl>,
}

impl NodeDeclaration {
    /// Default value of every input, in socket order.
    pub fn default_inputs(&self) -> Vec<StackValue> {
        self.inputs.iter().map(|s| s.default).collect()
    }
}

/// A shader node backed by a curve mapping.
pub trait ShaderNode {
    /// Registered node name.
    fn name(&self) -> &'static str;

    fn declaration(&self) -> NodeDeclaration;

    fn mapping(&self) -> &CurveMapping;

    /// Mutable access for editing; edits invalidate the baked tables.
    fn mapping_mut(&mut self) -> &mut CurveMapping;

    /// Interpreted evaluation of one tick. `inputs` are read through the
    /// stack conversions into the declared socket types.
    fn exec(&self, inputs: &[StackValue]) -> Result<Vec<StackValue>, NodeError>;

    /// Pack the mapping into `material` and link the variant call.
    fn gpu(
        &self,
        material: &mut dyn GpuMaterial,
        inputs: &[&str],
        output: &str,
    ) -> Result<ShaderVariant, NodeError>;
}

pub(crate) fn check_inputs<'a>(
    node: &'static str,
    inputs: &'a [StackValue],
    expected: usize,
) -> Result<&'a [StackValue], NodeError> {
    if inputs.len() == expected {
        Ok(inputs)
    } else {
        Err(NodeError::SocketCount {
            node,
            kind: "inputs",
            expected,
            got: inputs.len(),
        })
    }
}

pub(crate) fn check_gpu_inputs<'a, 'b>(
    node: &'static str,
    inputs: &'a [&'b str],
) -> Result<(&'b str, &'b str), NodeError> {
    match inputs {
        [fac, value] => Ok((*fac, *value)),
        _ => Err(NodeError::SocketCount {
            node,
            kind: "inputs",
            expected: 2,
            got: inputs.len(),
        }),
    }
}
