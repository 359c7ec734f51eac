//! Module registration and dependency resolution.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Result, ShaderError};
use crate::module::ShaderModule;

/// Name of the built-in sentinel module that enables standard injection stubs.
pub const INJECT_MODULE: &str = "inject";

/// A set of named shader modules.
///
/// Every registry starts with the empty [`INJECT_MODULE`] sentinel.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    modules: FxHashMap<String, Arc<ShaderModule>>,
    default_modules: Vec<String>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        let mut modules = FxHashMap::default();
        modules.insert(
            INJECT_MODULE.to_owned(),
            Arc::new(ShaderModule::new(INJECT_MODULE)),
        );
        Self {
            modules,
            default_modules: Vec::new(),
        }
    }

    /// Add a module, replacing any module of the same name.
    pub fn register(&mut self, module: ShaderModule) -> Arc<ShaderModule> {
        let module = Arc::new(module);
        if self
            .modules
            .insert(module.name().to_owned(), Arc::clone(&module))
            .is_some()
        {
            tracing::debug!(module = module.name(), "replaced shader module");
        }
        module
    }

    pub fn register_all(&mut self, modules: impl IntoIterator<Item = ShaderModule>) {
        for module in modules {
            self.register(module);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ShaderModule>> {
        self.modules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Number of registered modules, the sentinel included.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules prepended to every [`resolve`](Self::resolve) request.
    pub fn set_default_modules<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_modules = names.into_iter().map(Into::into).collect();
    }

    pub fn default_modules(&self) -> &[String] {
        &self.default_modules
    }

    /// Resolve `names` (after the default modules) into dependency order.
    ///
    /// Each module appears once, after all of its dependencies. The order is
    /// a depth-first post-order over the request, so it is deterministic.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<ShaderModule>>> {
        let mut resolver = Resolver {
            registry: self,
            order: Vec::new(),
            done: FxHashSet::default(),
            path: Vec::new(),
        };
        for name in &self.default_modules {
            resolver.visit(name)?;
        }
        for name in names {
            resolver.visit(name.as_ref())?;
        }
        Ok(resolver.order)
    }
}

struct Resolver<'a> {
    registry: &'a ModuleRegistry,
    order: Vec<Arc<ShaderModule>>,
    done: FxHashSet<String>,
    path: Vec<String>,
}

impl Resolver<'_> {
    fn visit(&mut self, name: &str) -> Result<()> {
        if self.done.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.path.iter().position(|n| n == name) {
            let mut chain = self.path[start..].to_vec();
            chain.push(name.to_owned());
            return Err(ShaderError::CyclicDependency { chain });
        }

        let module = self
            .registry
            .get(name)
            .ok_or_else(|| ShaderError::UnknownModule(name.to_owned()))?;

        self.path.push(name.to_owned());
        for dependency in module.dependency_names() {
            self.visit(dependency)?;
        }
        self.path.pop();

        self.done.insert(name.to_owned());
        self.order.push(module);
        Ok(())
    }
}

static GLOBAL_REGISTRY: Lazy<RwLock<ModuleRegistry>> =
    Lazy::new(|| RwLock::new(ModuleRegistry::new()));

/// Register a module with the process-wide registry.
pub fn register_module(module: ShaderModule) -> Arc<ShaderModule> {
    GLOBAL_REGISTRY.write().register(module)
}

/// Resolve against the process-wide registry.
pub fn resolve_modules<S: AsRef<str>>(names: &[S]) -> Result<Vec<Arc<ShaderModule>>> {
    GLOBAL_REGISTRY.read().resolve(names)
}

/// Set the default modules of the process-wide registry.
pub fn set_default_modules<I, S>(names: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    GLOBAL_REGISTRY.write().set_default_modules(names);
}

/// Run `f` with shared access to the process-wide registry.
pub fn with_global_registry<R>(f: impl FnOnce(&ModuleRegistry) -> R) -> R {
    f(&GLOBAL_REGISTRY.read())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(modules: &[Arc<ShaderModule>]) -> Vec<&str> {
        modules.iter().map(|m| m.name()).collect()
    }

    #[test]
    fn dependencies_come_first_and_once() {
        let mut registry = ModuleRegistry::new();
        registry.register(ShaderModule::new("b"));
        registry.register(ShaderModule::new("c").dependencies(["b"]));
        registry.register(ShaderModule::new("a").dependencies(["b", "c"]));

        let order = registry.resolve(&["a"]).unwrap();
        assert_eq!(names(&order), ["b", "c", "a"]);
    }

    #[test]
    fn unknown_module_fails() {
        let mut registry = ModuleRegistry::new();
        registry.register(ShaderModule::new("a").dependencies(["missing"]));
        assert_eq!(
            registry.resolve(&["a"]).unwrap_err(),
            ShaderError::UnknownModule("missing".into())
        );
    }

    #[test]
    fn cycles_fail_fast() {
        let mut registry = ModuleRegistry::new();
        registry.register(ShaderModule::new("a").dependencies(["b"]));
        registry.register(ShaderModule::new("b").dependencies(["c"]));
        registry.register(ShaderModule::new("c").dependencies(["a"]));

        let err = registry.resolve(&["a"]).unwrap_err();
        assert_eq!(
            err,
            ShaderError::CyclicDependency {
                chain: vec!["a".into(), "b".into(), "c".into(), "a".into()]
            }
        );
        assert_eq!(err.to_string(), "Cyclic shader module dependency: a -> b -> c -> a");
    }

    #[test]
    fn default_modules_are_prepended_and_deduplicated() {
        let mut registry = ModuleRegistry::new();
        registry.register(ShaderModule::new("picking"));
        registry.register(ShaderModule::new("fog"));
        registry.set_default_modules(["picking"]);

        let order = registry.resolve(&["fog", "picking"]).unwrap();
        assert_eq!(names(&order), ["picking", "fog"]);
    }

    #[test]
    fn replacing_keeps_one_entry() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.contains(INJECT_MODULE));
        registry.register(ShaderModule::new("fog").define("fog_mode", "1"));
        registry.register(ShaderModule::new("fog").define("fog_mode", "2"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("fog").unwrap().defines().get("FOG_MODE"), Some("2"));
    }
}
