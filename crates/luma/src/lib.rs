//! Composable shaders and iterative GPU computation.
//!
//! This crate re-exports the workspace:
//!
//! - [`luma_core`]: shader stages, GLSL versions, uniform values, platform
//!   description and logging setup.
//! - [`luma_shadertools`]: the module registry and shader assembler.
//! - [`luma_gl`]: buffers, programs and capture objects on a [`GlDevice`].
//!
//! and adds [`Transform`], which drives double-buffered transform feedback
//! passes over programs built by the assembler.
//!
//! ```no_run
//! use luma::{init_logging, LoggingConfig, RawGlDevice, Transform, TransformOptions};
//! use luma::{Buffer, BufferDesc, BufferLayout, ModuleRegistry, RunOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! init_logging(LoggingConfig::default());
//! let mut device = RawGlDevice::new()?;
//! let positions = Buffer::from_slice(
//!     &mut device,
//!     BufferDesc::default().layout(BufferLayout::with_size(2)),
//!     &[0.0f32; 2048],
//! )?;
//!
//! let options = TransformOptions::new(
//!     "#version 300 es\nin vec2 position;\nout vec2 nextPosition;\n\
//!      uniform float dt;\n\
//!      void main() { nextPosition = position + vec2(dt); }\n",
//! )
//! .feedback("position", "nextPosition")
//! .source_buffer("position", positions)
//! .element_count(1024);
//! let mut transform = Transform::initialize(&mut device, &ModuleRegistry::new(), options)?;
//!
//! for _ in 0..60 {
//!     transform.run(&mut device, &RunOptions::default().uniform("dt", 0.016_f32));
//!     transform.swap()?;
//! }
//! transform.delete(&mut device);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod transform;

pub use luma_core;
pub use luma_gl;
pub use luma_shadertools;

pub use error::{Result, TransformError};
pub use transform::{
    BufferUpdate, FeedbackMap, RunOptions, Transform, TransformOptions, TransformPhase,
};

pub use luma_core::{
    init_logging, GlslVersion, LoggingConfig, ModuleOptions, PlatformInfo, ShaderStage,
    UniformMap, UniformValue,
};
pub use luma_gl::{
    Buffer, BufferDesc, BufferLayout, BufferMap, DrawMode, ElementType, GlDevice, RawGlDevice,
};
pub use luma_shadertools::{
    assemble_shaders, register_module, resolve_modules, AssembleOptions, ModuleRegistry,
    ShaderError, ShaderModule,
};
