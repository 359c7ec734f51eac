//! GPU buffers carrying their layout metadata.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use crate::bytes::{slice_as_bytes, AsBytes};
use crate::device::{GlDevice, GlHandle};

/// Buffers by logical (attribute or varying) name.
pub type BufferMap = BTreeMap<String, Buffer>;

/// Scalar component type. Discriminants are the GL enum values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum ElementType {
    Byte = 0x1400,
    UnsignedByte = 0x1401,
    Short = 0x1402,
    UnsignedShort = 0x1403,
    Int = 0x1404,
    UnsignedInt = 0x1405,
    #[default]
    Float = 0x1406,
}

impl ElementType {
    pub fn from_gl(value: gl::types::GLenum) -> Option<Self> {
        Self::from_u32(value)
    }

    pub fn gl_enum(self) -> gl::types::GLenum {
        self as gl::types::GLenum
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            ElementType::Byte | ElementType::UnsignedByte => 1,
            ElementType::Short | ElementType::UnsignedShort => 2,
            ElementType::Int | ElementType::UnsignedInt | ElementType::Float => 4,
        }
    }

    pub fn is_integer(self) -> bool {
        self != ElementType::Float
    }
}

/// Allocation hint. Discriminants are the GL enum values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum BufferUsage {
    StreamDraw = 0x88E0,
    StreamCopy = 0x88E2,
    #[default]
    StaticDraw = 0x88E4,
    StaticCopy = 0x88E6,
    DynamicDraw = 0x88E8,
    DynamicCopy = 0x88EA,
}

impl BufferUsage {
    pub fn gl_enum(self) -> gl::types::GLenum {
        self as gl::types::GLenum
    }
}

/// Binding point used when allocating. Discriminants are the GL enum values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum BufferTarget {
    #[default]
    Array = 0x8892,
    TransformFeedback = 0x8C8E,
    Uniform = 0x8A11,
}

impl BufferTarget {
    pub fn gl_enum(self) -> gl::types::GLenum {
        self as gl::types::GLenum
    }
}

/// How vertex attributes are read from a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferLayout {
    /// Components per vertex (1-4).
    pub size: u32,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
    /// Instancing divisor; `0` advances per vertex.
    pub divisor: u32,
}

impl Default for BufferLayout {
    fn default() -> Self {
        Self {
            size: 1,
            normalized: false,
            stride: 0,
            offset: 0,
            divisor: 0,
        }
    }
}

impl BufferLayout {
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

/// Everything needed to allocate a buffer, or to allocate another one like it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    pub byte_length: usize,
    pub element_type: ElementType,
    pub usage: BufferUsage,
    pub layout: BufferLayout,
    pub target: BufferTarget,
}

impl BufferDesc {
    /// `byte_length` bytes of single-component floats.
    pub fn new(byte_length: usize) -> Self {
        Self {
            byte_length,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    #[must_use]
    pub fn usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: BufferLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn target(mut self, target: BufferTarget) -> Self {
        self.target = target;
        self
    }

    /// Same length, type and layout: one can stand in for the other.
    pub fn same_layout(&self, other: &BufferDesc) -> bool {
        self.byte_length == other.byte_length
            && self.element_type == other.element_type
            && self.layout == other.layout
    }
}

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

struct BufferInner {
    id: u64,
    handle: GlHandle,
    desc: BufferDesc,
}

/// A shared handle to a GPU buffer.
///
/// Clones refer to the same GPU buffer and compare equal. The GPU memory is
/// released by [`delete`](Buffer::delete), not by dropping handles.
#[derive(Clone)]
pub struct Buffer(Rc<BufferInner>);

impl Buffer {
    pub fn new(device: &mut dyn GlDevice, desc: BufferDesc) -> Result<Self> {
        Self::create(device, desc, None)
    }

    /// Allocate and upload `data`, which sets the byte length.
    pub fn with_data(device: &mut dyn GlDevice, mut desc: BufferDesc, data: &[u8]) -> Result<Self> {
        desc.byte_length = data.len();
        Self::create(device, desc, Some(data))
    }

    /// Allocate and upload a slice of scalars; the element type follows `T`.
    pub fn from_slice<T: AsBytes>(
        device: &mut dyn GlDevice,
        desc: BufferDesc,
        data: &[T],
    ) -> Result<Self> {
        Self::with_data(device, desc.element_type(T::ELEMENT_TYPE), slice_as_bytes(data))
    }

    /// Allocate an uninitialised buffer laid out like `other`.
    pub fn with_same_layout(device: &mut dyn GlDevice, other: &Buffer) -> Result<Self> {
        Self::create(device, *other.desc(), None)
    }

    fn create(device: &mut dyn GlDevice, desc: BufferDesc, data: Option<&[u8]>) -> Result<Self> {
        let handle = device.create_buffer(&desc, data)?;
        let id = NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(id, handle, bytes = desc.byte_length, "created buffer");
        Ok(Self(Rc::new(BufferInner { id, handle, desc })))
    }

    /// Process-unique id, stable across clones.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn handle(&self) -> GlHandle {
        self.0.handle
    }

    pub fn desc(&self) -> &BufferDesc {
        &self.0.desc
    }

    pub fn byte_length(&self) -> usize {
        self.0.desc.byte_length
    }

    pub fn element_type(&self) -> ElementType {
        self.0.desc.element_type
    }

    pub fn usage(&self) -> BufferUsage {
        self.0.desc.usage
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.0.desc.layout
    }

    /// Number of whole vertices the buffer holds.
    pub fn vertex_count(&self) -> usize {
        let per_vertex = self.element_type().size_in_bytes() * self.layout().size.max(1) as usize;
        self.byte_length() / per_vertex
    }

    /// Release the GPU buffer. Other handles to it become dangling names.
    pub fn delete(&self, device: &mut dyn GlDevice) {
        tracing::trace!(id = self.id(), handle = self.handle(), "deleting buffer");
        device.delete_buffer(self.handle());
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Buffer {}

impl Hash for Buffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id())
            .field("handle", &self.handle())
            .field("byte_length", &self.byte_length())
            .field("element_type", &self.element_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDevice;

    #[test]
    fn clones_share_identity() {
        let mut device = RecordingDevice::new();
        let a = Buffer::new(&mut device, BufferDesc::new(64)).unwrap();
        let b = Buffer::new(&mut device, BufferDesc::new(64)).unwrap();

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.handle(), b.handle());
    }

    #[test]
    fn same_layout_copies_metadata() {
        let mut device = RecordingDevice::new();
        let desc = BufferDesc::new(48)
            .element_type(ElementType::Float)
            .usage(BufferUsage::DynamicCopy)
            .layout(BufferLayout::with_size(3));
        let source = Buffer::new(&mut device, desc).unwrap();
        let copy = Buffer::with_same_layout(&mut device, &source).unwrap();

        assert_ne!(source, copy);
        assert_eq!(copy.desc(), source.desc());
        assert!(copy.desc().same_layout(source.desc()));
        assert_eq!(copy.vertex_count(), 4);
    }

    #[test]
    fn data_sets_length() {
        let mut device = RecordingDevice::new();
        let buffer = Buffer::with_data(&mut device, BufferDesc::default(), &[0u8; 12]).unwrap();
        assert_eq!(buffer.byte_length(), 12);
        assert_eq!(buffer.vertex_count(), 3);
    }

    #[test]
    fn typed_upload() {
        let mut device = RecordingDevice::new();
        let desc = BufferDesc::default().layout(BufferLayout::with_size(2));
        let buffer = Buffer::from_slice(&mut device, desc, &[1u16, 2, 3, 4]).unwrap();
        assert_eq!(buffer.element_type(), ElementType::UnsignedShort);
        assert_eq!(buffer.byte_length(), 8);
        assert_eq!(buffer.vertex_count(), 2);
    }

    #[test]
    fn element_types_from_gl() {
        assert_eq!(ElementType::from_gl(gl::FLOAT), Some(ElementType::Float));
        assert_eq!(
            ElementType::from_gl(gl::UNSIGNED_SHORT).map(ElementType::size_in_bytes),
            Some(2)
        );
        assert_eq!(ElementType::from_gl(gl::TRIANGLES), None);
    }
}
