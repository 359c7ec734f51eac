//! GPU resources for transform feedback.
//!
//! The [`GlDevice`] trait is the seam between resource bookkeeping and the
//! driver. [`RawGlDevice`] implements it on top of the host's current OpenGL
//! context; with the `testing` feature, `RecordingDevice` implements it by
//! recording commands.
//!
//! Resources ([`Buffer`], [`Program`], [`TransformFeedback`]) hold plain GL
//! names and are released explicitly through the device that created them.

pub mod buffer;
pub mod bytes;
pub mod device;
pub mod program;
pub mod raw;
pub mod transform_feedback;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use buffer::{
    Buffer, BufferDesc, BufferLayout, BufferMap, BufferTarget, BufferUsage, ElementType,
};
pub use bytes::AsBytes;
pub use device::{DrawMode, GlDevice, GlHandle};
pub use program::Program;
pub use raw::RawGlDevice;
pub use transform_feedback::TransformFeedback;
