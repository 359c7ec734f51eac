//! Composable GLSL shader modules.
//!
//! Register [`ShaderModule`]s with a [`ModuleRegistry`] (or the process-wide
//! one through [`register_module`]), then call [`assemble_shaders`] to get
//! compilable vertex/fragment source with module code, defines and platform
//! prologues spliced in, plus a [`UniformComposer`] for the module uniforms.
//!
//! Nothing here touches the GPU; compilation is up to the caller.

pub mod assemble;
pub mod defines;
pub mod error;
pub mod inject;
pub mod module;
pub mod platform_defines;
pub mod registry;
mod text;
pub mod transpile;

pub use assemble::{
    assemble_shader, assemble_shaders, assemble_uniform_function, get_shader_version,
    AssembleOptions, AssembledShader, StageOptions, UniformComposer,
};
pub use defines::ShaderDefines;
pub use error::{Result, ShaderError};
pub use inject::{inject_shader, parse_injections, InjectionPoint, DECLARATION_INJECT_MARKER};
pub use module::{
    Deprecation, DeprecationKind, DeprecationMatch, DeprecationStatus, ShaderModule,
    UniformProvider,
};
pub use registry::{
    register_module, resolve_modules, set_default_modules, with_global_registry, ModuleRegistry,
    INJECT_MODULE,
};
pub use transpile::{transpile, transpile_to_number};
