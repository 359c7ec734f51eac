//! Adapting module source to the GLSL dialect of the shader it is spliced into.

use luma_core::{GlslVersion, ShaderStage};

use crate::error::{Result, ShaderError};
use crate::text::{find_output_declaration, replace_calls, replace_qualifier, replace_word};

const LOD_CALLS: &[&str] = &[
    "texture2DLod",
    "texture2DLodEXT",
    "textureCubeLod",
    "textureCubeLodEXT",
];
const PROJ_LOD_CALLS: &[&str] = &["texture2DProjLod", "texture2DProjLodEXT"];
const PROJ_CALLS: &[&str] = &["texture2DProj", "texture2DProjEXT"];
const SAMPLE_CALLS: &[&str] = &["texture2D", "texture2DEXT", "textureCube", "textureCubeEXT"];

/// Rewrite `source` so it compiles under `target`.
///
/// Only simple, unambiguous constructs are rewritten: sampling built-ins and
/// the storage qualifiers of single-variable declarations.
pub fn transpile(source: &str, stage: ShaderStage, target: GlslVersion) -> String {
    match target {
        GlslVersion::Es300 => to_es300(source, stage),
        GlslVersion::Es100 => to_es100(source, stage),
    }
}

/// [`transpile`] with a raw `#version` number as the target.
pub fn transpile_to_number(source: &str, stage: ShaderStage, version: u32) -> Result<String> {
    let target = GlslVersion::from_number(version).ok_or(ShaderError::UnsupportedVersion(version))?;
    Ok(transpile(source, stage, target))
}

fn to_es300(source: &str, stage: ShaderStage) -> String {
    let out = replace_calls(source, LOD_CALLS, "textureLod");
    let out = replace_calls(&out, PROJ_LOD_CALLS, "textureProjLod");
    let out = replace_calls(&out, PROJ_CALLS, "textureProj");
    let out = replace_calls(&out, SAMPLE_CALLS, "texture");
    match stage {
        ShaderStage::Vertex => {
            let out = replace_qualifier(&out, "attribute", "in");
            replace_qualifier(&out, "varying", "out")
        }
        ShaderStage::Fragment => replace_qualifier(&out, "varying", "in"),
    }
}

fn to_es100(source: &str, stage: ShaderStage) -> String {
    let out = replace_calls(source, &["texture"], "texture2D");
    let out = replace_calls(&out, &["textureProj"], "texture2DProj");
    match stage {
        ShaderStage::Vertex => {
            let out = replace_calls(&out, &["textureLod"], "texture2DLod");
            let out = replace_qualifier(&out, "in", "attribute");
            replace_qualifier(&out, "out", "varying")
        }
        ShaderStage::Fragment => {
            let out = replace_calls(&out, &["textureLod"], "texture2DLodEXT");
            let out = replace_qualifier(&out, "in", "varying");
            fragment_output_to_frag_color(&out)
        }
    }
}

/// ES 1.00 has no user-declared fragment outputs; write to `gl_FragColor`.
fn fragment_output_to_frag_color(source: &str) -> String {
    match find_output_declaration(source) {
        Some((start, end, name)) => {
            let name = name.to_owned();
            let stripped = format!("{}{}", &source[..start], &source[end..]);
            replace_word(&stripped, &name, "gl_FragColor")
        }
        None => source.to_owned(),
    }
}
