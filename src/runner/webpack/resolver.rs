//! The module resolver: linear, guarded scans over the live registry.
//!
//! Nothing is cached between calls. The registry grows while the host runs,
//! so a module missing now may be found by the next search.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::runner::ds::error::{JErrorType, ShimError};
use crate::runner::ds::object::HostKind;
use crate::runner::ds::operations::object::{for_in_keys, get, get_optional};
use crate::runner::ds::value::JsValue;
use crate::runner::logger::SharedLogger;
use crate::runner::webpack::filters::{self, Filter};
use crate::runner::webpack::polyfill::ClassNamePolyfill;
use crate::runner::webpack::registry::{ModuleRecord, SharedRegistry};

pub(crate) const FILTER_LOG_SCOPE: &str = "WebpackModules~getModule";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Stop at the first match.
    pub first: bool,
    /// Return `A`, `Ay` or `default` instead of the exports holding them.
    pub default_export: bool,
    /// Also test each named export.
    pub search_exports: bool,
    /// Return the module record instead of its exports.
    pub raw: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            first: true,
            default_export: true,
            search_exports: false,
            raw: false,
        }
    }
}

impl SearchOptions {
    pub fn all(mut self) -> Self {
        self.first = false;
        self
    }

    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn search_exports(mut self) -> Self {
        self.search_exports = true;
        self
    }

    pub fn keep_wrapper(mut self) -> Self {
        self.default_export = false;
        self
    }
}

#[derive(Debug, Clone)]
pub enum ModuleMatch {
    Exports(JsValue),
    Raw(Rc<ModuleRecord>),
}

impl ModuleMatch {
    /// The matched value; for raw matches, the record's exports.
    pub fn value(&self) -> JsValue {
        match self {
            ModuleMatch::Exports(v) => v.clone(),
            ModuleMatch::Raw(r) => r.exports.clone(),
        }
    }

    pub fn record(&self) -> Option<&Rc<ModuleRecord>> {
        match self {
            ModuleMatch::Raw(r) => Some(r),
            ModuleMatch::Exports(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SearchResult {
    Single(ModuleMatch),
    All(Vec<ModuleMatch>),
}

impl SearchResult {
    pub fn into_matches(self) -> Vec<ModuleMatch> {
        match self {
            SearchResult::Single(m) => vec![m],
            SearchResult::All(v) => v,
        }
    }

    pub fn into_values(self) -> Vec<JsValue> {
        self.into_matches().iter().map(|m| m.value()).collect()
    }

    pub fn first_value(&self) -> Option<JsValue> {
        match self {
            SearchResult::Single(m) => Some(m.value()),
            SearchResult::All(v) => v.first().map(|m| m.value()),
        }
    }
}

pub struct ModuleResolver {
    registry: SharedRegistry,
    logger: SharedLogger,
    defaults: SearchOptions,
    polyfill: ClassNamePolyfill,
    warned_filters: RefCell<HashSet<usize>>,
}

pub type SharedResolver = Rc<ModuleResolver>;

impl ModuleResolver {
    pub fn new(registry: SharedRegistry, logger: SharedLogger) -> Self {
        Self::with_defaults(registry, logger, SearchOptions::default())
    }

    /// `defaults` seeds the options of the convenience lookups.
    pub fn with_defaults(
        registry: SharedRegistry,
        logger: SharedLogger,
        defaults: SearchOptions,
    ) -> Self {
        ModuleResolver {
            registry,
            logger,
            defaults,
            polyfill: ClassNamePolyfill::new(),
            warned_filters: RefCell::new(HashSet::new()),
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn defaults(&self) -> SearchOptions {
        self.defaults
    }

    pub(crate) fn logger(&self) -> &SharedLogger {
        &self.logger
    }

    /// Scan the registry with `filter`. `None` when nothing matched; with
    /// `first == false` every match, in registry order.
    pub fn get_module(&self, filter: &Filter, options: &SearchOptions) -> Option<SearchResult> {
        let mut found = Vec::new();
        for record in self.registry.records() {
            let exports = &record.exports;
            if should_skip_module(exports) {
                continue;
            }
            self.polyfill.apply(exports);

            let wrap = |value: &JsValue| {
                if options.raw {
                    ModuleMatch::Raw(record.clone())
                } else {
                    ModuleMatch::Exports(value.clone())
                }
            };

            if options.search_exports && is_plain_object(exports) && !has_typed_array_prop(exports) {
                if self.guarded_test(filter, exports, &record) {
                    if options.first {
                        return Some(SearchResult::Single(wrap(exports)));
                    }
                    found.push(wrap(exports));
                }
                let o = match exports.as_object() {
                    Some(o) => o,
                    None => continue,
                };
                for key in for_in_keys(o) {
                    let value = match get(o, &key) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    if !value.is_object_like() {
                        continue;
                    }
                    if self.guarded_test(filter, &value, &record) {
                        if options.first {
                            return Some(SearchResult::Single(wrap(&value)));
                        }
                        found.push(wrap(&value));
                    }
                }
            } else if let Some(hit) = self.match_default_exports(filter, &record, options) {
                let m = wrap(&hit);
                if options.first {
                    return Some(SearchResult::Single(m));
                }
                found.push(m);
            }
        }
        if options.first || found.is_empty() {
            None
        } else {
            Some(SearchResult::All(found))
        }
    }

    /// Tests `A`, `Ay`, `default` (for ES modules) and the exports itself.
    /// Later candidates overwrite earlier ones.
    fn match_default_exports(
        &self,
        filter: &Filter,
        record: &ModuleRecord,
        options: &SearchOptions,
    ) -> Option<JsValue> {
        let exports = &record.exports;
        let mut found = None;
        for key in &["A", "Ay"] {
            let candidate = get_optional(exports, key).unwrap_or(JsValue::Undefined);
            if candidate.is_truthy() && self.guarded_test(filter, &candidate, record) {
                found = Some(if options.default_export {
                    candidate
                } else {
                    exports.clone()
                });
            }
        }
        let is_es_module = get_optional(exports, "__esModule")
            .map(|v| v.is_truthy())
            .unwrap_or(false);
        if is_es_module {
            let default = get_optional(exports, "default").unwrap_or(JsValue::Undefined);
            if default.is_truthy() && self.guarded_test(filter, &default, record) {
                found = Some(if options.default_export {
                    default
                } else {
                    exports.clone()
                });
            }
        }
        if self.guarded_test(filter, exports, record) {
            found = Some(exports.clone());
        }
        found
    }

    /// Like [`get_module`](Self::get_module), but a miss is an error.
    pub fn get_module_fatal(
        &self,
        filter: &Filter,
        options: &SearchOptions,
    ) -> Result<SearchResult, ShimError> {
        self.get_module(filter, options)
            .ok_or(ShimError::ModuleSearchFailed)
    }

    /// Runs `filter` with the resolver's guards. Never fails: an error is
    /// reported once per filter and counts as a miss.
    pub(crate) fn guarded_test(&self, filter: &Filter, value: &JsValue, record: &ModuleRecord) -> bool {
        match guarded(filter, value, record) {
            Ok(hit) => hit,
            Err(e) => {
                if self.warned_filters.borrow_mut().insert(filter.id()) {
                    self.logger
                        .warn(FILTER_LOG_SCOPE, "Module filter threw an exception.", Some(&e));
                }
                false
            }
        }
    }

    fn single(&self, filter: &Filter) -> Option<JsValue> {
        let options = SearchOptions {
            first: true,
            raw: false,
            ..self.defaults
        };
        self.get_module(filter, &options)
            .and_then(|r| r.first_value())
    }

    fn every(&self, filter: &Filter) -> Vec<JsValue> {
        let options = SearchOptions {
            first: false,
            raw: false,
            ..self.defaults
        };
        self.get_module(filter, &options)
            .map(|r| r.into_values())
            .unwrap_or_default()
    }

    pub fn find(&self, filter: &Filter) -> Option<JsValue> {
        self.single(filter)
    }

    pub fn find_all(&self, filter: &Filter) -> Vec<JsValue> {
        self.every(filter)
    }

    pub fn get_by_keys(&self, keys: &[&str]) -> Option<JsValue> {
        self.single(&filters::by_keys(keys))
    }

    pub fn get_all_by_keys(&self, keys: &[&str]) -> Vec<JsValue> {
        self.every(&filters::by_keys(keys))
    }

    pub fn find_by_unique_properties(&self, props: &[&str]) -> Option<JsValue> {
        self.get_by_keys(props)
    }

    pub fn find_all_by_unique_properties(&self, props: &[&str]) -> Vec<JsValue> {
        self.get_all_by_keys(props)
    }

    pub fn get_by_display_name(&self, name: &str) -> Option<JsValue> {
        self.single(&filters::by_display_name(name))
    }

    pub fn get_by_strings(&self, strings: &[&str]) -> Option<JsValue> {
        self.single(&filters::by_strings(strings))
    }

    pub fn get_all_by_strings(&self, strings: &[&str]) -> Vec<JsValue> {
        self.every(&filters::by_strings(strings))
    }

    pub fn get_by_prototype_keys(&self, fields: &[&str]) -> Option<JsValue> {
        self.single(&filters::by_prototype_keys(fields))
    }

    pub fn get_by_regex(&self, regex: regex::Regex) -> Option<JsValue> {
        self.single(&filters::by_regex(regex))
    }

    pub fn get_by_source(&self, matchers: Vec<filters::SourceMatcher>) -> Option<JsValue> {
        self.single(&filters::by_source(matchers))
    }

    pub fn get_store(&self, name: &str) -> Option<JsValue> {
        self.single(&filters::by_store_name(name))
    }
}

fn is_plain_object(v: &JsValue) -> bool {
    v.is_object_like() && !v.is_callable()
}

fn has_typed_array_prop(exports: &JsValue) -> bool {
    get_optional(exports, "TypedArray")
        .map(|v| v.is_truthy())
        .unwrap_or(false)
}

/// Exports that must never reach a filter: falsy values, host globals,
/// typed arrays and anything carrying a `TypedArray` property.
fn should_skip_module(exports: &JsValue) -> bool {
    if !exports.is_truthy() {
        return true;
    }
    if has_typed_array_prop(exports) {
        return true;
    }
    match exports.as_object() {
        Some(o) => {
            let borrowed = (**o).borrow();
            if borrowed.is_typed_array() {
                return true;
            }
            matches!(
                borrowed.host_kind(),
                Some(HostKind::Window)
                    | Some(HostKind::Document)
                    | Some(HostKind::DomTokenList)
                    | Some(HostKind::Symbol)
            )
        }
        None => false,
    }
}

fn looks_like_storage(v: &JsValue) -> Result<bool, JErrorType> {
    Ok(get_optional(v, "remove")?.is_truthy()
        && get_optional(v, "set")?.is_truthy()
        && get_optional(v, "clear")?.is_truthy()
        && get_optional(v, "get")?.is_truthy()
        && !get_optional(v, "sort")?.is_truthy())
}

fn carries_token(v: &JsValue) -> Result<bool, JErrorType> {
    Ok(get_optional(v, "getToken")?.is_truthy()
        || get_optional(v, "getEmail")?.is_truthy()
        || get_optional(v, "showToken")?.is_truthy())
}

/// Storage-like and credential-bearing modules are never matched, directly
/// or through their `default` export.
fn guarded(filter: &Filter, value: &JsValue, record: &ModuleRecord) -> Result<bool, JErrorType> {
    if let Some(o) = value.as_object() {
        if (**o).borrow().host_kind() == Some(HostKind::Window) {
            return Ok(false);
        }
    }
    let default = get_optional(value, "default")?;
    if looks_like_storage(&default)? || looks_like_storage(value)? {
        return Ok(false);
    }
    if carries_token(&default)? || carries_token(value)? {
        return Ok(false);
    }
    filter.test(value, record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::builder::ObjectBuilder;
    use crate::runner::ds::object::{new_host_object, new_typed_array};
    use crate::runner::logger::RecordingLogger;
    use crate::runner::webpack::registry::ModuleRegistry;

    fn resolver(registry: SharedRegistry) -> ModuleResolver {
        ModuleResolver::new(registry, Rc::new(RecordingLogger::new()))
    }

    #[test]
    fn test_skips_host_globals() {
        let registry = ModuleRegistry::shared();
        registry.register(1u64, JsValue::Object(new_host_object(HostKind::Window)));
        registry.register(2u64, JsValue::Object(new_typed_array(vec![1, 2])));
        registry.register(3u64, JsValue::from(0));
        let r = resolver(registry);
        assert!(r.find(&Filter::simple(|_| true)).is_none());
    }

    #[test]
    fn test_storage_module_never_matches() {
        let registry = ModuleRegistry::shared();
        let storage = ObjectBuilder::new()
            .add_method("get", |_, _| Ok(JsValue::Undefined))
            .add_method("set", |_, _| Ok(JsValue::Undefined))
            .add_method("remove", |_, _| Ok(JsValue::Undefined))
            .add_method("clear", |_, _| Ok(JsValue::Undefined))
            .build_value();
        registry.register(1u64, storage);
        let r = resolver(registry);
        assert!(r.get_by_keys(&["get"]).is_none());
    }

    #[test]
    fn test_all_returns_none_when_empty() {
        let r = resolver(ModuleRegistry::shared());
        assert!(r
            .get_module(&Filter::simple(|_| true), &SearchOptions::default().all())
            .is_none());
    }
}
