//! Shader modules: named, reusable fragments of GLSL plus their metadata.

use std::fmt;
use std::sync::Arc;

use luma_core::{GlslVersion, ModuleOptions, ShaderStage, UniformMap};

use crate::defines::ShaderDefines;
use crate::text::contains_call;
use crate::transpile::transpile;

/// Computes a module's uniforms from caller options.
///
/// `prior` holds the uniforms composed by modules earlier in dependency
/// order, so a module can build on values its dependencies expose.
pub trait UniformProvider: Send + Sync {
    fn uniforms(&self, options: &ModuleOptions, prior: &UniformMap) -> UniformMap;
}

impl<F> UniformProvider for F
where
    F: Fn(&ModuleOptions, &UniformMap) -> UniformMap + Send + Sync,
{
    fn uniforms(&self, options: &ModuleOptions, prior: &UniformMap) -> UniformMap {
        self(options, prior)
    }
}

/// What a deprecation rule looks for in shader source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeprecationKind {
    /// A call `old(`.
    Function,
    /// A declaration `<type_name> old;` (e.g. `uniform float old;`).
    Declaration { type_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeprecationStatus {
    /// Renamed; still works but should be migrated.
    Deprecated,
    /// No longer provided.
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub kind: DeprecationKind,
    pub old: String,
    pub new: String,
    pub status: DeprecationStatus,
}

impl Deprecation {
    pub fn function(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            kind: DeprecationKind::Function,
            old: old.into(),
            new: new.into(),
            status: DeprecationStatus::Deprecated,
        }
    }

    pub fn declaration(
        type_name: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        Self {
            kind: DeprecationKind::Declaration {
                type_name: type_name.into(),
            },
            old: old.into(),
            new: new.into(),
            status: DeprecationStatus::Deprecated,
        }
    }

    /// Mark the symbol as removed rather than renamed.
    #[must_use]
    pub fn removed(mut self) -> Self {
        self.status = DeprecationStatus::Removed;
        self
    }

    pub fn matches(&self, source: &str) -> bool {
        match &self.kind {
            DeprecationKind::Function => contains_call(source, &self.old),
            DeprecationKind::Declaration { type_name } => {
                source.contains(&format!("{type_name} {};", self.old))
            }
        }
    }
}

/// A deprecated symbol found in caller source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationMatch {
    pub module: String,
    pub old: String,
    pub new: String,
    pub status: DeprecationStatus,
}

/// A named fragment of vertex and/or fragment source.
///
/// Built with the consuming builder methods and then handed to a
/// [`ModuleRegistry`](crate::ModuleRegistry), which freezes it behind an `Arc`.
#[derive(Clone)]
pub struct ShaderModule {
    name: String,
    vs: Option<String>,
    fs: Option<String>,
    dependencies: Vec<String>,
    defines: ShaderDefines,
    uniforms: Option<Arc<dyn UniformProvider>>,
    deprecations: Vec<Deprecation>,
}

impl ShaderModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vs: None,
            fs: None,
            dependencies: Vec::new(),
            defines: ShaderDefines::new(),
            uniforms: None,
            deprecations: Vec::new(),
        }
    }

    #[must_use]
    pub fn vertex(mut self, source: impl Into<String>) -> Self {
        self.vs = Some(source.into());
        self
    }

    #[must_use]
    pub fn fragment(mut self, source: impl Into<String>) -> Self {
        self.fs = Some(source.into());
        self
    }

    #[must_use]
    pub fn dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn define(mut self, name: &str, value: impl Into<String>) -> Self {
        self.defines.set(name, value);
        self
    }

    #[must_use]
    pub fn uniforms(mut self, provider: impl UniformProvider + 'static) -> Self {
        self.uniforms = Some(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn deprecate(mut self, rule: Deprecation) -> Self {
        self.deprecations.push(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependency_names(&self) -> &[String] {
        &self.dependencies
    }

    pub fn defines(&self) -> &ShaderDefines {
        &self.defines
    }

    pub fn deprecations(&self) -> &[Deprecation] {
        &self.deprecations
    }

    pub fn raw_source(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => self.vs.as_deref(),
            ShaderStage::Fragment => self.fs.as_deref(),
        }
    }

    /// Stage source transpiled to `version` and wrapped in module markers.
    ///
    /// A module without source for `stage` contributes nothing, not even
    /// its `MODULE_` define.
    pub fn get_source(&self, stage: ShaderStage, version: GlslVersion) -> String {
        let source = match self.raw_source(stage) {
            Some(source) if !source.is_empty() => transpile(source, stage, version),
            _ => return String::new(),
        };

        let mut out = String::with_capacity(source.len() + 2 * self.name.len() + 32);
        out.push_str("#define MODULE_");
        out.push_str(&self.name.to_ascii_uppercase());
        out.push('\n');
        out.push_str(&source);
        if !source.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("// END MODULE_");
        out.push_str(&self.name);
        out.push_str("\n\n");
        out
    }

    /// Uniforms for `options`. Modules without a provider contribute none.
    pub fn get_uniforms(&self, options: &ModuleOptions, prior: &UniformMap) -> UniformMap {
        match &self.uniforms {
            Some(provider) => provider.uniforms(options, prior),
            None => UniformMap::new(),
        }
    }

    /// Scan caller source for deprecated symbols of this module.
    ///
    /// Every match is logged and returned; nothing here fails.
    pub fn check_deprecations(&self, source: &str) -> Vec<DeprecationMatch> {
        let mut matches = Vec::new();
        for rule in self.deprecations.iter().filter(|rule| rule.matches(source)) {
            match rule.status {
                DeprecationStatus::Deprecated => tracing::warn!(
                    module = %self.name,
                    "`{}` is deprecated, use `{}`",
                    rule.old,
                    rule.new
                ),
                DeprecationStatus::Removed => tracing::info!(
                    module = %self.name,
                    "`{}` has been removed ({})",
                    rule.old,
                    rule.new
                ),
            }
            matches.push(DeprecationMatch {
                module: self.name.clone(),
                old: rule.old.clone(),
                new: rule.new.clone(),
                status: rule.status,
            });
        }
        matches
    }
}

impl fmt::Debug for ShaderModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderModule")
            .field("name", &self.name)
            .field("vs", &self.vs.as_ref().map(String::len))
            .field("fs", &self.fs.as_ref().map(String::len))
            .field("dependencies", &self.dependencies)
            .field("defines", &self.defines)
            .field("has_uniforms", &self.uniforms.is_some())
            .field("deprecations", &self.deprecations.len())
            .finish()
    }
}
