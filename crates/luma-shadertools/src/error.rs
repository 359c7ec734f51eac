//! Error types for module resolution and shader assembly.

use thiserror::Error;

/// Failure while resolving modules or assembling shader source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// A requested (or depended-upon) module is not registered.
    #[error("Unknown shader module: {0}")]
    UnknownModule(String),

    /// The module dependency graph contains a cycle.
    ///
    /// `chain` starts and ends with the module that was revisited.
    #[error("Cyclic shader module dependency: {}", chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    /// A numeric transpilation target that is neither 100 nor 300.
    #[error("Unsupported GLSL version: {0}")]
    UnsupportedVersion(u32),

    /// An injection key with a stage prefix but an unknown hook.
    #[error("Unknown shader injection hook: {0}")]
    InvalidInjection(String),
}

/// Alias for `Result<T, ShaderError>`.
pub type Result<T> = std::result::Result<T, ShaderError>;
