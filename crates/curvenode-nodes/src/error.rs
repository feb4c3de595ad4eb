use crate::stack::SocketType;

/// Errors raised by the node adapters.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Curve(#[from] curvenode_core::CurveError),
    #[error(transparent)]
    Gpu(#[from] curvenode_gpu::GpuError),
    #[error("socket {socket}: expected {expected:?}, got {got:?}")]
    SocketType {
        socket: &'static str,
        expected: SocketType,
        got: SocketType,
    },
    #[error("{node} takes {expected} {kind}, got {got}")]
    SocketCount {
        node: &'static str,
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{node} needs a {expected}-channel mapping, got {got}")]
    ChannelCount {
        node: &'static str,
        expected: usize,
        got: usize,
    },
}
