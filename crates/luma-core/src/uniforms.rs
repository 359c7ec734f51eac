//! Uniform values produced by shader modules and consumed by programs.

use std::collections::BTreeMap;

/// A named collection of uniform values.
///
/// Ordered so that composed uniform sets iterate (and upload) deterministically.
pub type UniformMap = BTreeMap<String, UniformValue>;

/// Options handed to module uniform functions.
///
/// Modules read what they understand and ignore the rest.
pub type ModuleOptions = UniformMap;

/// A single uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
}

impl UniformValue {
    /// Scalar view of numeric values. Vectors and arrays return `None`.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            UniformValue::Float(v) => Some(v),
            UniformValue::Int(v) => Some(v as f32),
            UniformValue::UInt(v) => Some(v as f32),
            UniformValue::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            UniformValue::Int(v) => Some(v),
            UniformValue::UInt(v) => i32::try_from(v).ok(),
            UniformValue::Bool(v) => Some(i32::from(v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            UniformValue::Bool(v) => Some(v),
            UniformValue::Int(v) => Some(v != 0),
            UniformValue::UInt(v) => Some(v != 0),
            _ => None,
        }
    }

    /// Number of scalar components this value uploads.
    pub fn component_count(&self) -> usize {
        match self {
            UniformValue::Bool(_)
            | UniformValue::Int(_)
            | UniformValue::UInt(_)
            | UniformValue::Float(_) => 1,
            UniformValue::Vec2(_) => 2,
            UniformValue::Vec3(_) => 3,
            UniformValue::Vec4(_) => 4,
            UniformValue::Mat3(_) => 9,
            UniformValue::Mat4(_) => 16,
            UniformValue::FloatArray(v) => v.len(),
            UniformValue::IntArray(v) => v.len(),
        }
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::UInt(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<[f32; 16]> for UniformValue {
    fn from(v: [f32; 16]) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<Vec<f32>> for UniformValue {
    fn from(v: Vec<f32>) -> Self {
        UniformValue::FloatArray(v)
    }
}

impl From<Vec<i32>> for UniformValue {
    fn from(v: Vec<i32>) -> Self {
        UniformValue::IntArray(v)
    }
}
