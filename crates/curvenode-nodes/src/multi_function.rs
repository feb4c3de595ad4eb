//! Multi-function adapter: the nodes' vectorized evaluation entry point.
//!
//! The host framework owns parameter storage and masks; it talks to a node
//! function through [`MultiFunction`], passing inputs as [`VArray`]s and
//! outputs as mutable spans in [`MFParams`].

use std::marker::PhantomData;

use curvenode_core::{BatchEvaluator, CurveElement, CurveMapping, EvalConfig, IndexMask, VArray};
use glam::{Vec3, Vec4};

use crate::error::NodeError;
use crate::stack::SocketType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: &'static str,
    pub kind: ParamKind,
    pub ty: SocketType,
}

/// Name and parameter list of a multi-function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: &'static str,
    pub params: Vec<ParamDecl>,
}

impl Signature {
    fn input_decl(&self, index: usize) -> Option<&ParamDecl> {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Input)
            .nth(index)
    }

    fn output_decl(&self, index: usize) -> Option<&ParamDecl> {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Output)
            .nth(index)
    }
}

pub enum MFInput<'a> {
    Float(VArray<'a, f32>),
    Vector(VArray<'a, Vec3>),
    Rgba(VArray<'a, Vec4>),
}

impl MFInput<'_> {
    pub fn socket_type(&self) -> SocketType {
        match self {
            Self::Float(_) => SocketType::Float,
            Self::Vector(_) => SocketType::Vector,
            Self::Rgba(_) => SocketType::Rgba,
        }
    }
}

pub enum MFOutput<'a> {
    Float(&'a mut [f32]),
    Vector(&'a mut [Vec3]),
    Rgba(&'a mut [Vec4]),
}

impl MFOutput<'_> {
    pub fn socket_type(&self) -> SocketType {
        match self {
            Self::Float(_) => SocketType::Float,
            Self::Vector(_) => SocketType::Vector,
            Self::Rgba(_) => SocketType::Rgba,
        }
    }
}

/// Positional parameters of one call, inputs and outputs numbered
/// separately in signature order.
#[derive(Default)]
pub struct MFParams<'a> {
    inputs: Vec<MFInput<'a>>,
    outputs: Vec<MFOutput<'a>>,
}

impl<'a> MFParams<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, input: MFInput<'a>) -> &mut Self {
        self.inputs.push(input);
        self
    }

    pub fn add_output(&mut self, output: MFOutput<'a>) -> &mut Self {
        self.outputs.push(output);
        self
    }
}

/// A vectorized function callable by the host framework.
pub trait MultiFunction: Send + Sync {
    fn signature(&self) -> &Signature;

    /// Compute the outputs for every index in `mask`.
    fn call(&self, mask: &IndexMask, params: &mut MFParams<'_>) -> Result<(), NodeError>;
}

/// Element types with a matching socket.
pub trait SocketElement: CurveElement + 'static {
    const SOCKET: SocketType;

    fn input<'a>(input: &MFInput<'a>) -> Option<VArray<'a, Self>>;
    fn output<'b>(output: &'b mut MFOutput<'_>) -> Option<&'b mut [Self]>;
}

impl SocketElement for Vec3 {
    const SOCKET: SocketType = SocketType::Vector;

    fn input<'a>(input: &MFInput<'a>) -> Option<VArray<'a, Self>> {
        match input {
            MFInput::Vector(values) => Some(*values),
            _ => None,
        }
    }

    fn output<'b>(output: &'b mut MFOutput<'_>) -> Option<&'b mut [Self]> {
        match output {
            MFOutput::Vector(values) => Some(&mut values[..]),
            _ => None,
        }
    }
}

impl SocketElement for Vec4 {
    const SOCKET: SocketType = SocketType::Rgba;

    fn input<'a>(input: &MFInput<'a>) -> Option<VArray<'a, Self>> {
        match input {
            MFInput::Rgba(values) => Some(*values),
            _ => None,
        }
    }

    fn output<'b>(output: &'b mut MFOutput<'_>) -> Option<&'b mut [Self]> {
        match output {
            MFOutput::Rgba(values) => Some(&mut values[..]),
            _ => None,
        }
    }
}

/// `(Fac, value) -> value` over one mapping's frozen tables.
pub struct CurveFunction<T> {
    signature: Signature,
    evaluator: BatchEvaluator,
    _element: PhantomData<fn() -> T>,
}

impl CurveFunction<Vec3> {
    /// The "Curve Vec" function.
    pub fn vector(mapping: &CurveMapping, config: EvalConfig) -> Self {
        Self::build("Curve Vec", "Vector", mapping, config)
    }
}

impl CurveFunction<Vec4> {
    /// The "Curve RGB" function.
    pub fn rgb(mapping: &CurveMapping, config: EvalConfig) -> Self {
        Self::build("Curve RGB", "Color", mapping, config)
    }
}

impl<T: SocketElement> CurveFunction<T> {
    fn build(
        name: &'static str,
        socket: &'static str,
        mapping: &CurveMapping,
        config: EvalConfig,
    ) -> Self {
        Self {
            signature: Signature {
                name,
                params: vec![
                    ParamDecl {
                        name: "Fac",
                        kind: ParamKind::Input,
                        ty: SocketType::Float,
                    },
                    ParamDecl {
                        name: socket,
                        kind: ParamKind::Input,
                        ty: T::SOCKET,
                    },
                    ParamDecl {
                        name: socket,
                        kind: ParamKind::Output,
                        ty: T::SOCKET,
                    },
                ],
            },
            evaluator: BatchEvaluator::with_config(mapping, config),
            _element: PhantomData,
        }
    }

    /// Typed entry point, bypassing the positional parameter plumbing.
    pub fn apply(
        &self,
        mask: &IndexMask,
        fac: VArray<'_, f32>,
        input: VArray<'_, T>,
        output: &mut [T],
    ) -> Result<(), NodeError> {
        Ok(self.evaluator.apply(mask, fac, input, output)?)
    }

    fn mismatch(&self, decl: Option<&ParamDecl>, expected: SocketType, got: SocketType) -> NodeError {
        NodeError::SocketType {
            socket: decl.map_or("?", |d| d.name),
            expected,
            got,
        }
    }
}

impl<T: SocketElement> MultiFunction for CurveFunction<T> {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut MFParams<'_>) -> Result<(), NodeError> {
        if params.inputs.len() != 2 || params.outputs.len() != 1 {
            return Err(NodeError::SocketCount {
                node: self.signature.name,
                kind: "parameters",
                expected: 3,
                got: params.inputs.len() + params.outputs.len(),
            });
        }

        let fac = match &params.inputs[0] {
            MFInput::Float(fac) => *fac,
            other => {
                return Err(self.mismatch(
                    self.signature.input_decl(0),
                    SocketType::Float,
                    other.socket_type(),
                ));
            }
        };
        let input = T::input(&params.inputs[1]).ok_or_else(|| {
            self.mismatch(
                self.signature.input_decl(1),
                T::SOCKET,
                params.inputs[1].socket_type(),
            )
        })?;
        let got = params.outputs[0].socket_type();
        let output = T::output(&mut params.outputs[0])
            .ok_or_else(|| self.mismatch(self.signature.output_decl(0), T::SOCKET, got))?;

        self.apply(mask, fac, input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures() {
        let vec_fn = CurveFunction::vector(&CurveMapping::vector(), EvalConfig::default());
        assert_eq!(vec_fn.signature().name, "Curve Vec");
        assert_eq!(vec_fn.signature().params.len(), 3);
        assert_eq!(vec_fn.signature().params[1].ty, SocketType::Vector);

        let rgb_fn = CurveFunction::rgb(&CurveMapping::color(), EvalConfig::default());
        assert_eq!(rgb_fn.signature().name, "Curve RGB");
        assert_eq!(rgb_fn.signature().params[2].kind, ParamKind::Output);
        assert_eq!(rgb_fn.signature().params[2].ty, SocketType::Rgba);
    }

    #[test]
    fn test_call_through_params() {
        let mapping = CurveMapping::color();
        let function = CurveFunction::rgb(&mapping, EvalConfig::default());
        let input = [Vec4::splat(0.25), Vec4::splat(0.75)];
        let mut output = [Vec4::ZERO; 2];
        {
            let mut params = MFParams::new();
            params
                .add_input(MFInput::Float(VArray::Single(1.0)))
                .add_input(MFInput::Rgba(VArray::Span(&input[..])))
                .add_output(MFOutput::Rgba(&mut output[..]));
            function.call(&IndexMask::full(2), &mut params).unwrap();
        }
        for (a, b) in input.iter().zip(&output) {
            assert!((*a - *b).abs().max_element() < 1e-5);
        }
    }

    #[test]
    fn test_call_rejects_wrong_socket_type() {
        let function = CurveFunction::vector(&CurveMapping::vector(), EvalConfig::default());
        let input = [Vec4::ZERO];
        let mut output = [Vec3::ZERO];
        let mut params = MFParams::new();
        params
            .add_input(MFInput::Float(VArray::Single(1.0)))
            .add_input(MFInput::Rgba(VArray::Span(&input[..])))
            .add_output(MFOutput::Vector(&mut output[..]));
        let err = function.call(&IndexMask::full(1), &mut params).unwrap_err();
        assert!(matches!(
            err,
            NodeError::SocketType {
                socket: "Vector",
                expected: SocketType::Vector,
                got: SocketType::Rgba,
            }
        ));
    }

    #[test]
    fn test_call_rejects_missing_output() {
        let function = CurveFunction::vector(&CurveMapping::vector(), EvalConfig::default());
        let mut params = MFParams::new();
        params
            .add_input(MFInput::Float(VArray::Single(1.0)))
            .add_input(MFInput::Vector(VArray::Single(Vec3::ZERO)));
        assert!(matches!(
            function.call(&IndexMask::full(1), &mut params),
            Err(NodeError::SocketCount { .. })
        ));
    }
}
