/// Errors raised by mapping construction, editing, and the batch adapter.
///
/// Curve evaluation itself is total and never fails.
#[derive(Debug, thiserror::Error)]
pub enum CurveError {
    #[error("curve mappings have 3 or 4 channels, got {0}")]
    ChannelCount(usize),
    #[error("channel {index} out of range for a {count}-channel mapping")]
    ChannelIndex { index: usize, count: usize },
    #[error("point {index} out of range for a {len}-point curve")]
    PointIndex { index: usize, len: usize },
    #[error("a point already exists at x = {0}")]
    DuplicateX(f32),
    #[error("a curve needs at least 2 points")]
    TooFewPoints,
    #[error("non-finite control point ({0}, {1})")]
    NonFinite(f32, f32),
    #[error("invalid clip rectangle ({min_x}, {min_y})-({max_x}, {max_y})")]
    InvalidClip {
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
    },
    #[error("mask index {index} out of bounds for length {len}")]
    MaskOutOfBounds { index: usize, len: usize },
    #[error("{name} has {got} elements, expected at least {expected}")]
    SpanLength {
        name: &'static str,
        got: usize,
        expected: usize,
    },
    #[error("invalid config value for {key}: {value}")]
    Config { key: &'static str, value: String },
    #[error("mapping JSON: {0}")]
    Json(#[from] serde_json::Error),
}
