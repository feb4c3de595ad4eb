//! Interpreted-evaluator stack slots and their implicit conversions.

use glam::{Vec3, Vec4};

/// Data type carried by a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    Float,
    Vector,
    Rgba,
}

/// One value on the interpreted evaluator's stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StackValue {
    Float(f32),
    Vector(Vec3),
    Rgba(Vec4),
}

impl StackValue {
    pub fn socket_type(&self) -> SocketType {
        match self {
            Self::Float(_) => SocketType::Float,
            Self::Vector(_) => SocketType::Vector,
            Self::Rgba(_) => SocketType::Rgba,
        }
    }

    /// Vectors average their components; colors use luminance weights.
    pub fn as_float(&self) -> f32 {
        match *self {
            Self::Float(f) => f,
            Self::Vector(v) => (v.x + v.y + v.z) / 3.0,
            Self::Rgba(c) => 0.35 * c.x + 0.45 * c.y + 0.2 * c.z,
        }
    }

    pub fn as_vector(&self) -> Vec3 {
        match *self {
            Self::Float(f) => Vec3::splat(f),
            Self::Vector(v) => v,
            Self::Rgba(c) => c.truncate(),
        }
    }

    /// Floats and vectors gain an opaque alpha.
    pub fn as_color(&self) -> Vec4 {
        match *self {
            Self::Float(f) => Vec4::new(f, f, f, 1.0),
            Self::Vector(v) => v.extend(1.0),
            Self::Rgba(c) => c,
        }
    }

    /// Read the slot as `ty`.
    pub fn convert(&self, ty: SocketType) -> Self {
        match ty {
            SocketType::Float => Self::Float(self.as_float()),
            SocketType::Vector => Self::Vector(self.as_vector()),
            SocketType::Rgba => Self::Rgba(self.as_color()),
        }
    }
}

impl From<f32> for StackValue {
    fn from(f: f32) -> Self {
        Self::Float(f)
    }
}

impl From<Vec3> for StackValue {
    fn from(v: Vec3) -> Self {
        Self::Vector(v)
    }
}

impl From<Vec4> for StackValue {
    fn from(c: Vec4) -> Self {
        Self::Rgba(c)
    }
}
