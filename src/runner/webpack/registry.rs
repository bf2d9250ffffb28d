//! The live module registry the resolver scans.
//!
//! Records are appended as the host lazily loads code and are never removed,
//! so a record handed out once stays valid for the whole session.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::runner::ds::value::JsValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleId {
    Num(u64),
    Str(String),
}

impl ModuleId {
    /// Numeric-looking ids become `Num`, everything else `Str`.
    pub fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) => ModuleId::Num(n),
            Err(_) => ModuleId::Str(s.to_string()),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Num(n) => write!(f, "{}", n),
            ModuleId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for ModuleId {
    fn from(n: u64) -> Self {
        ModuleId::Num(n)
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        ModuleId::parse(s)
    }
}

/// One built module: `{ id, exports }`, plus the factory source text when
/// the host exposes it.
#[derive(Debug)]
pub struct ModuleRecord {
    pub id: ModuleId,
    pub exports: JsValue,
    pub source: Option<String>,
}

pub struct ModuleRegistry {
    modules: RefCell<IndexMap<ModuleId, Rc<ModuleRecord>>>,
}

pub type SharedRegistry = Rc<ModuleRegistry>;

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry {
            modules: RefCell::new(IndexMap::new()),
        }
    }

    pub fn shared() -> SharedRegistry {
        Rc::new(Self::new())
    }

    /// Add a module. A second registration under an existing id keeps the
    /// first record, matching a bundler that never re-executes a factory.
    pub fn register(&self, id: impl Into<ModuleId>, exports: JsValue) -> Rc<ModuleRecord> {
        self.insert(id.into(), exports, None)
    }

    pub fn register_with_source(
        &self,
        id: impl Into<ModuleId>,
        exports: JsValue,
        source: impl Into<String>,
    ) -> Rc<ModuleRecord> {
        self.insert(id.into(), exports, Some(source.into()))
    }

    fn insert(&self, id: ModuleId, exports: JsValue, source: Option<String>) -> Rc<ModuleRecord> {
        self.modules
            .borrow_mut()
            .entry(id.clone())
            .or_insert_with(|| {
                Rc::new(ModuleRecord {
                    id,
                    exports,
                    source,
                })
            })
            .clone()
    }

    pub fn get(&self, id: &ModuleId) -> Option<Rc<ModuleRecord>> {
        self.modules.borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.modules.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.borrow().is_empty()
    }

    pub fn ids(&self) -> Vec<ModuleId> {
        self.modules.borrow().keys().cloned().collect()
    }

    /// The records present right now, in registration order. Scans iterate
    /// this copy so filters may load further modules without invalidating
    /// the walk.
    pub fn records(&self) -> Vec<Rc<ModuleRecord>> {
        self.modules.borrow().values().cloned().collect()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
