/// Errors raised by the GPU packer, color-band atlas and compute evaluator.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to map readback buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),
    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("readback callback was dropped before completing")]
    ReadbackDropped,
    #[error("color band row has {got} texels, expected {expected}")]
    BandWidth { got: usize, expected: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
