//! Known-module table for name-based patch targets.

use indexmap::IndexMap;

use crate::runner::ds::value::JsValue;
use crate::runner::webpack::resolver::ModuleResolver;

/// Read-only `name -> module` table the host fills once at startup.
///
/// `PatchTarget::ByKnownName("React")` resolves through a plain lookup here.
#[derive(Debug, Clone, Default)]
pub struct KnownModules {
    modules: IndexMap<String, JsValue>,
}

impl KnownModules {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a module (builder style).
    pub fn with(mut self, name: impl Into<String>, module: JsValue) -> Self {
        self.insert(name, module);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, module: JsValue) {
        self.modules.insert(name.into(), module);
    }

    /// The module under `name`, `None` when absent or nullish.
    pub fn get(&self, name: &str) -> Option<JsValue> {
        self.modules
            .get(name)
            .filter(|m| m.is_truthy())
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Get list of all registered names.
    pub fn names(&self) -> Vec<&String> {
        self.modules.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Fill the table by looking each entry's properties up in `resolver`.
    /// Names whose module cannot be found are left out.
    pub fn from_lookups(resolver: &ModuleResolver, lookups: &[(&str, &[&str])]) -> Self {
        let mut known = Self::new();
        for (name, props) in lookups {
            if let Some(module) = resolver.get_by_keys(props) {
                known.insert(*name, module);
            }
        }
        known
    }
}
