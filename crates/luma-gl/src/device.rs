//! The driver command surface.

use anyhow::Result;
use num_derive::{FromPrimitive, ToPrimitive};

use luma_core::{PlatformInfo, UniformValue};

use crate::buffer::BufferDesc;

/// A GL object name (buffer, program, transform feedback).
pub type GlHandle = gl::types::GLuint;

/// Primitive topology for draws. Discriminants are the GL enum values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum DrawMode {
    #[default]
    Points = 0x0000,
    Lines = 0x0001,
    LineLoop = 0x0002,
    LineStrip = 0x0003,
    Triangles = 0x0004,
    TriangleStrip = 0x0005,
    TriangleFan = 0x0006,
}

impl DrawMode {
    pub fn gl_enum(self) -> gl::types::GLenum {
        self as gl::types::GLenum
    }

    /// The primitive mode capture has to be started with for this draw mode.
    ///
    /// Transform feedback only captures points, lines and triangles; strips,
    /// loops and fans are captured as their base primitive.
    pub fn feedback_primitive(self) -> DrawMode {
        match self {
            DrawMode::Points => DrawMode::Points,
            DrawMode::Lines | DrawMode::LineLoop | DrawMode::LineStrip => DrawMode::Lines,
            DrawMode::Triangles | DrawMode::TriangleStrip | DrawMode::TriangleFan => {
                DrawMode::Triangles
            }
        }
    }
}

/// Driver commands needed to allocate buffers, build capture programs and run
/// transform feedback passes.
///
/// Creation calls report driver failures (compile/link logs, allocation
/// errors). State-setting calls are fire-and-forget, like the GL calls behind
/// them.
pub trait GlDevice {
    /// What the assembler should know about this context.
    fn platform_info(&self) -> PlatformInfo;

    /// Allocate a buffer; `data` (if any) is exactly `desc.byte_length` bytes.
    fn create_buffer(&mut self, desc: &BufferDesc, data: Option<&[u8]>) -> Result<GlHandle>;
    fn delete_buffer(&mut self, buffer: GlHandle);

    /// Compile and link, capturing `varyings` into separate buffers.
    fn create_program(&mut self, vs: &str, fs: &str, varyings: &[String]) -> Result<GlHandle>;
    fn delete_program(&mut self, program: GlHandle);
    fn use_program(&mut self, program: GlHandle);

    /// Location of an active vertex attribute, `None` if the program lacks it.
    fn attribute_location(&self, program: GlHandle, name: &str) -> Option<u32>;
    fn bind_attribute(&mut self, location: u32, buffer: GlHandle, desc: &BufferDesc);
    fn disable_attribute(&mut self, location: u32);
    fn set_uniform(&mut self, program: GlHandle, name: &str, value: &UniformValue);

    fn create_transform_feedback(&mut self) -> Result<GlHandle>;
    fn delete_transform_feedback(&mut self, transform_feedback: GlHandle);
    /// Bind a capture object; `0` restores the default one.
    fn bind_transform_feedback(&mut self, transform_feedback: GlHandle);
    /// Attach (or, with `None`, detach) a buffer at a capture index.
    fn bind_feedback_buffer(&mut self, index: u32, buffer: Option<GlHandle>);
    fn begin_transform_feedback(&mut self, primitive: DrawMode);
    fn end_transform_feedback(&mut self);

    fn set_rasterizer_discard(&mut self, enabled: bool);
    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize);
}
