//! Platform and version compatibility prologues.

use luma_core::{GlslFeatures, GlslVersion, GpuVendor, PlatformInfo, ShaderStage};

/// Vendor defines plus the emulated-fp64 workarounds each driver family needs.
pub fn platform_defines(platform: &PlatformInfo) -> String {
    match platform.vendor {
        GpuVendor::Nvidia => "\
#define NVIDIA_GPU
// Nvidia drivers fold away the arithmetic emulated fp64 relies on
#define LUMA_FP64_CODE_ELIMINATION_WORKAROUND 1
"
        .to_owned(),
        GpuVendor::Intel => "\
#define INTEL_GPU
#define LUMA_FP64_CODE_ELIMINATION_WORKAROUND 1
#define LUMA_FP32_TAN_PRECISION_WORKAROUND 1
#define LUMA_FP64_HIGH_BITS_OVERFLOW_WORKAROUND 1
"
        .to_owned(),
        GpuVendor::Amd => "#define AMD_GPU\n".to_owned(),
        GpuVendor::Unknown => "\
#define DEFAULT_GPU
#define LUMA_FP64_CODE_ELIMINATION_WORKAROUND 1
#define LUMA_FP32_TAN_PRECISION_WORKAROUND 1
#define LUMA_FP64_HIGH_BITS_OVERFLOW_WORKAROUND 1
"
        .to_owned(),
    }
}

const VERSION_FEATURES: &str = "\
#if (__VERSION__ > 120)
# define FEATURE_GLSL_DERIVATIVES
# define FEATURE_GLSL_DRAW_BUFFERS
# define FEATURE_GLSL_FRAG_DEPTH
# define FEATURE_GLSL_TEXTURE_LOD
#endif
";

/// Feature defines for the declared `version`, enabling extensions where an
/// ES 1.00 shader has to opt into them.
///
/// Multiple render targets are fragment-only, so only that stage gets the
/// `gl_FragData` block.
pub fn version_defines(
    platform: &PlatformInfo,
    version: GlslVersion,
    stage: ShaderStage,
) -> String {
    let mut out = String::from("\n// FEATURES\n");
    out.push_str(VERSION_FEATURES);

    if version == GlslVersion::Es100 {
        let blocks = [
            (GlslFeatures::TEXTURE_LOD, "GL_EXT_shader_texture_lod", "FEATURE_GLSL_TEXTURE_LOD"),
            (GlslFeatures::DERIVATIVES, "GL_OES_standard_derivatives", "FEATURE_GLSL_DERIVATIVES"),
            (GlslFeatures::FRAG_DEPTH, "GL_EXT_frag_depth", "FEATURE_GLSL_FRAG_DEPTH"),
        ];
        for (feature, extension, define) in blocks {
            if platform.has_feature(feature) {
                push_extension(&mut out, extension, define);
            }
        }
    }

    if stage == ShaderStage::Fragment {
        if version == GlslVersion::Es100 && platform.has_feature(GlslFeatures::DRAW_BUFFERS) {
            push_extension(&mut out, "GL_EXT_draw_buffers", "FEATURE_GLSL_DRAW_BUFFERS");
        }
        out.push_str(match version {
            GlslVersion::Es300 => "#define FRAGMENT_OUTPUT_QUALIFIER out\n",
            GlslVersion::Es100 => "#define FRAGMENT_OUTPUT_QUALIFIER\n",
        });
    }
    out
}

fn push_extension(out: &mut String, extension: &str, define: &str) {
    out.push_str(&format!(
        "#ifdef {extension}\n#extension {extension} : enable\n\
         # ifndef {define}\n#  define {define}\n# endif\n#endif\n"
    ));
}
