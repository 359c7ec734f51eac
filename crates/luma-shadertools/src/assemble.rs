//! Final shader source assembly.
//!
//! Output order, per stage:
//!
//! ```text
//! #version ...            (only if the caller's source declared one)
//! #define SHADER_NAME ... (only with an id, and only if the body has none)
//! platform defines
//! version / feature defines
//! module + application defines
//! precision prologue      (fragment only)
//! module sources          (dependency order)
//! caller body
//! ```
//!
//! Every define precedes the module code that may test it, and the body comes
//! last so it can use anything the modules declare.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use luma_core::{
    parse_version_directive, GlslVersion, ModuleOptions, PlatformInfo, ShaderStage, UniformMap,
};

use crate::defines::ShaderDefines;
use crate::error::Result;
use crate::inject::{inject_shader, parse_injections, InjectionPoint, DECLARATION_INJECT_MARKER};
use crate::module::ShaderModule;
use crate::platform_defines::{platform_defines, version_defines};
use crate::registry::{ModuleRegistry, INJECT_MODULE};

const FRAGMENT_SHADER_PROLOGUE: &str = "\
precision highp float;

";

/// Inputs for assembling a vertex/fragment pair.
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Used to synthesize `SHADER_NAME`, which shows up in GPU debuggers.
    pub id: Option<String>,
    pub vs: String,
    pub fs: String,
    pub modules: Vec<String>,
    pub defines: ShaderDefines,
    /// `(key, snippet)` pairs, applied in order. See [`InjectionPoint`].
    pub inject: Vec<(String, String)>,
}

impl AssembleOptions {
    pub fn new(vs: impl Into<String>, fs: impl Into<String>) -> Self {
        Self {
            vs: vs.into(),
            fs: fs.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn modules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn define(mut self, name: &str, value: impl Into<String>) -> Self {
        self.defines.set(name, value);
        self
    }

    #[must_use]
    pub fn inject(mut self, key: impl Into<String>, snippet: impl Into<String>) -> Self {
        self.inject.push((key.into(), snippet.into()));
        self
    }
}

/// Per-stage inputs for [`assemble_shader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StageOptions<'a> {
    pub id: Option<&'a str>,
    pub defines: Option<&'a ShaderDefines>,
    pub inject: &'a [(InjectionPoint, String)],
}

/// Result of [`assemble_shaders`]. The caller compiles the text.
#[derive(Debug, Clone)]
pub struct AssembledShader {
    pub vs: String,
    pub fs: String,
    pub uniforms: UniformComposer,
    /// Every module that took part, dependencies included.
    pub module_map: BTreeMap<String, Arc<ShaderModule>>,
}

/// Composes module uniforms in dependency order.
#[derive(Clone, Default)]
pub struct UniformComposer {
    modules: Vec<Arc<ShaderModule>>,
}

impl UniformComposer {
    pub fn new(modules: &[Arc<ShaderModule>]) -> Self {
        Self {
            modules: modules.to_vec(),
        }
    }

    /// Each module sees what the modules before it produced; on key
    /// collisions the later module wins.
    pub fn get_uniforms(&self, options: &ModuleOptions) -> UniformMap {
        let mut uniforms = UniformMap::new();
        for module in &self.modules {
            let produced = module.get_uniforms(options, &uniforms);
            uniforms.extend(produced);
        }
        uniforms
    }
}

impl fmt::Debug for UniformComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.modules.iter().map(|m| m.name()))
            .finish()
    }
}

/// Build the uniform composition for an already resolved module list.
pub fn assemble_uniform_function(modules: &[Arc<ShaderModule>]) -> UniformComposer {
    UniformComposer::new(modules)
}

/// Transpilation target for `source`: ES 3.00 iff its first line is a `#version` of 130 or higher.
pub fn get_shader_version(source: &str) -> GlslVersion {
    split_version(source)
        .0
        .map(GlslVersion::for_declared)
        .unwrap_or_default()
}

/// Resolve `options.modules` and assemble both stages.
pub fn assemble_shaders(
    registry: &ModuleRegistry,
    platform: &PlatformInfo,
    options: &AssembleOptions,
) -> Result<AssembledShader> {
    let modules = registry.resolve(options.modules.as_slice())?;
    let inject = parse_injections(&options.inject)?;
    let stage = StageOptions {
        id: options.id.as_deref(),
        defines: Some(&options.defines),
        inject: &inject,
    };

    let vs = assemble_shader(platform, ShaderStage::Vertex, &options.vs, &modules, &stage);
    let fs = assemble_shader(platform, ShaderStage::Fragment, &options.fs, &modules, &stage);

    tracing::debug!(
        id = options.id.as_deref().unwrap_or("<unnamed>"),
        modules = modules.len(),
        "assembled shaders"
    );

    Ok(AssembledShader {
        vs,
        fs,
        uniforms: assemble_uniform_function(&modules),
        module_map: modules
            .iter()
            .map(|m| (m.name().to_owned(), Arc::clone(m)))
            .collect(),
    })
}

/// Assemble one stage from already resolved modules.
pub fn assemble_shader(
    platform: &PlatformInfo,
    stage: ShaderStage,
    source: &str,
    modules: &[Arc<ShaderModule>],
    options: &StageOptions<'_>,
) -> String {
    let (declared, version_line, body) = split_version(source);
    let version = declared
        .map(GlslVersion::for_declared)
        .unwrap_or_default();

    let mut out = String::with_capacity(source.len() + 1024);
    if let Some(line) = version_line {
        out.push_str(line);
        out.push('\n');
    }

    if let Some(id) = options.id {
        if !body.contains("SHADER_NAME") {
            out.push_str(&format!("#define SHADER_NAME {id}_{}\n\n", stage.name()));
        }
    }

    out.push_str(&platform_defines(platform));
    out.push_str(&version_defines(platform, version, stage));

    let mut defines = ShaderDefines::new();
    for module in modules {
        defines.merge(module.defines());
    }
    if let Some(app) = options.defines {
        defines.merge(app);
    }
    if defines.is_empty() {
        out.push('\n');
    } else {
        out.push_str("\n// APPLICATION DEFINES\n");
        out.push_str(&defines.to_source());
        out.push('\n');
    }

    if stage == ShaderStage::Fragment {
        out.push_str(FRAGMENT_SHADER_PROLOGUE);
    }

    let mut standard_stubs = false;
    for module in modules {
        if module.name() == INJECT_MODULE {
            standard_stubs = true;
            continue;
        }
        module.check_deprecations(body);
        out.push_str(&module.get_source(stage, version));
    }

    out.push_str(DECLARATION_INJECT_MARKER);
    out.push('\n');
    out.push_str(body);

    inject_shader(&out, stage, options.inject, standard_stubs)
}

/// Split a leading `#version` line off `source`.
///
/// Returns `(declared number, directive line, remaining body)`.
fn split_version(source: &str) -> (Option<u32>, Option<&str>, &str) {
    let (first, rest) = source.split_once('\n').unwrap_or((source, ""));
    let first = first.trim_end_matches('\r');
    match parse_version_directive(first) {
        Some(number) => (Some(number), Some(first.trim()), rest),
        None => (None, None, source),
    }
}
