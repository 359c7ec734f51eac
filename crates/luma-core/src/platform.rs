//! Platform description used to specialise assembled shader source.
//!
//! A [`PlatformInfo`] is normally produced by the GPU device from a live
//! context (vendor string + extension list). The shader assembler only reads
//! it, so tests construct one by hand.

use bitflags::bitflags;

use crate::glsl::GlslVersion;

/// GPU vendor family, detected from the driver's vendor/renderer strings.
///
/// Several vendors need preprocessor workarounds in emulated 64-bit
/// arithmetic, so the assembler emits vendor-specific defines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Intel,
    Amd,
    #[default]
    Unknown,
}

impl GpuVendor {
    /// Classify a vendor or renderer string (case-insensitive).
    pub fn detect(vendor: &str) -> Self {
        let vendor = vendor.to_ascii_lowercase();
        if vendor.contains("nvidia") {
            GpuVendor::Nvidia
        } else if vendor.contains("intel") {
            GpuVendor::Intel
        } else if vendor.contains("amd") || vendor.contains("ati technologies") {
            GpuVendor::Amd
        } else {
            GpuVendor::Unknown
        }
    }
}

bitflags! {
    /// Optional GLSL capabilities exposed through extensions on ES 1.00
    /// contexts and built into ES 3.00.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct GlslFeatures: u32 {
        /// `gl_FragDepth` (`GL_EXT_frag_depth`).
        const FRAG_DEPTH = 1 << 0;
        /// `dFdx`/`dFdy`/`fwidth` (`GL_OES_standard_derivatives`).
        const DERIVATIVES = 1 << 1;
        /// `gl_FragData[n]` (`GL_EXT_draw_buffers`).
        const DRAW_BUFFERS = 1 << 2;
        /// Explicit LOD sampling (`GL_EXT_shader_texture_lod`).
        const TEXTURE_LOD = 1 << 3;
    }
}

impl GlslFeatures {
    /// Map a GL extension name onto the feature it enables.
    pub fn from_extension(name: &str) -> Self {
        match name {
            "GL_EXT_frag_depth" | "EXT_frag_depth" => GlslFeatures::FRAG_DEPTH,
            "GL_OES_standard_derivatives" | "OES_standard_derivatives" => {
                GlslFeatures::DERIVATIVES
            }
            "GL_EXT_draw_buffers" | "WEBGL_draw_buffers" => GlslFeatures::DRAW_BUFFERS,
            "GL_EXT_shader_texture_lod" | "EXT_shader_texture_lod" => GlslFeatures::TEXTURE_LOD,
            _ => GlslFeatures::empty(),
        }
    }
}

/// What the assembler needs to know about the running GPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlatformInfo {
    pub vendor: GpuVendor,
    pub features: GlslFeatures,
    /// Whether the context can capture vertex output (GL 3.0 / ES 3.0).
    pub transform_feedback: bool,
}

impl PlatformInfo {
    /// An ES 3.00 class context: every feature is core and capture is available.
    pub fn es3(vendor: GpuVendor) -> Self {
        Self {
            vendor,
            features: GlslFeatures::all(),
            transform_feedback: true,
        }
    }

    /// An ES 1.00 class context exposing `features` through extensions.
    pub fn es1(vendor: GpuVendor, features: GlslFeatures) -> Self {
        Self {
            vendor,
            features,
            transform_feedback: false,
        }
    }

    pub fn has_feature(&self, feature: GlslFeatures) -> bool {
        self.features.contains(feature)
    }

    /// Best GLSL transpilation target for this platform.
    pub fn best_glsl_version(&self) -> GlslVersion {
        if self.transform_feedback {
            GlslVersion::Es300
        } else {
            GlslVersion::Es100
        }
    }
}
