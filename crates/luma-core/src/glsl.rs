//! GLSL version and shader stage vocabulary.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

/// Supported GLSL transpilation targets.
///
/// The discriminant is the number that appears in the `#version` directive.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive, ToPrimitive,
)]
pub enum GlslVersion {
    /// GLSL ES 1.00 (WebGL 1, legacy `attribute`/`varying` syntax).
    #[default]
    Es100 = 100,
    /// GLSL ES 3.00 (WebGL 2, `in`/`out` syntax).
    Es300 = 300,
}

impl GlslVersion {
    /// Look up a target by its directive number.
    pub fn from_number(number: u32) -> Option<Self> {
        Self::from_u32(number)
    }

    /// The number written in the `#version` directive.
    pub fn number(self) -> u32 {
        self as u32
    }

    /// The full directive line, without a trailing newline.
    pub fn directive(self) -> &'static str {
        match self {
            GlslVersion::Es100 => "#version 100",
            GlslVersion::Es300 => "#version 300 es",
        }
    }

    /// Map an arbitrary declared version number onto a transpilation target.
    ///
    /// Anything from 1.30 upwards speaks the `in`/`out` dialect.
    pub fn for_declared(number: u32) -> Self {
        if number >= 130 {
            GlslVersion::Es300
        } else {
            GlslVersion::Es100
        }
    }
}

/// Parse a `#version` directive line and return the declared number.
///
/// Returns `None` if `line` is not a version directive. A directive with a
/// missing or malformed number is reported as version 100.
pub fn parse_version_directive(line: &str) -> Option<u32> {
    let rest = line.trim_start().strip_prefix("#version")?;
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let number = rest
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<u32>().ok())
        .unwrap_or(100);
    Some(number)
}

/// Programmable pipeline stage a piece of source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Lower-case stage name, used in synthesized `SHADER_NAME` defines.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    /// Short prefix used by injection keys (`vs:#main-start`).
    pub fn prefix(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs",
            ShaderStage::Fragment => "fs",
        }
    }
}
