use luma_shadertools::ShaderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransformError>;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Invalid transform configuration: {0}")]
    Configuration(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("GPU device error: {0:#}")]
    Device(#[from] anyhow::Error),
}
