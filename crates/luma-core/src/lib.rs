//! Shared vocabulary for the luma crates.
//!
//! Shader stages and GLSL versions, uniform values, the platform description
//! consumed by the shader assembler, and logger setup.

pub mod glsl;
pub mod logging;
pub mod platform;
pub mod uniforms;

pub use glsl::{parse_version_directive, GlslVersion, ShaderStage};
pub use logging::{init_logging, LoggingConfig};
pub use platform::{GlslFeatures, GpuVendor, PlatformInfo};
pub use uniforms::{ModuleOptions, UniformMap, UniformValue};
