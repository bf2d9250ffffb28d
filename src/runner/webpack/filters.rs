//! Predicates over module exports.
//!
//! A [`Filter`] answers "is this the module I want?" for one exports value.
//! It may fail; the resolver treats a failure as a non-match and reports it
//! once per filter identity.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use regex::Regex;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{call_function, function_to_string};
use crate::runner::ds::operations::object::{get_optional, get_v, has_property_v};
use crate::runner::ds::operations::type_conversion::to_display_string;
use crate::runner::ds::value::JsValue;
use crate::runner::webpack::registry::ModuleRecord;

pub type FilterFn = dyn Fn(&JsValue, &ModuleRecord) -> Result<bool, JErrorType>;

/// Maps a module to the component a filter should inspect.
pub type Mapper = Rc<dyn Fn(&JsValue) -> Result<JsValue, JErrorType>>;

static NEXT_FILTER_ID: AtomicUsize = AtomicUsize::new(1);

/// A module predicate. Clones share the identity of the original.
#[derive(Clone)]
pub struct Filter {
    id: usize,
    predicate: Rc<FilterFn>,
}

impl Filter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&JsValue, &ModuleRecord) -> Result<bool, JErrorType> + 'static,
    {
        Filter {
            id: NEXT_FILTER_ID.fetch_add(1, Ordering::Relaxed),
            predicate: Rc::new(predicate),
        }
    }

    /// A predicate over the exports value alone that never fails.
    pub fn simple<F>(predicate: F) -> Self
    where
        F: Fn(&JsValue) -> bool + 'static,
    {
        Filter::new(move |exports, _| Ok(predicate(exports)))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn test(&self, exports: &JsValue, record: &ModuleRecord) -> Result<bool, JErrorType> {
        (self.predicate)(exports, record)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter#{}", self.id)
    }
}

/// Something a module factory's source text must satisfy.
#[derive(Debug, Clone)]
pub enum SourceMatcher {
    Text(String),
    Pattern(Regex),
}

impl SourceMatcher {
    fn matches(&self, source: &str) -> bool {
        match self {
            SourceMatcher::Text(t) => source.contains(t.as_str()),
            SourceMatcher::Pattern(r) => r.is_match(source),
        }
    }
}

impl From<&str> for SourceMatcher {
    fn from(s: &str) -> Self {
        SourceMatcher::Text(s.to_string())
    }
}

impl From<Regex> for SourceMatcher {
    fn from(r: Regex) -> Self {
        SourceMatcher::Pattern(r)
    }
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// Every key is reachable on the module through its prototype chain.
pub fn by_keys(keys: &[&str]) -> Filter {
    let keys = owned(keys);
    Filter::simple(move |module| {
        module.is_object_like() && keys.iter().all(|k| has_property_v(module, k))
    })
}

/// Like [`by_keys`], checked against whatever `mapper` picks out of the
/// module.
pub fn by_keys_with(keys: &[&str], mapper: Mapper) -> Filter {
    let keys = owned(keys);
    Filter::new(move |module, _| {
        if !module.is_object_like() {
            return Ok(false);
        }
        let component = mapper(module)?;
        if !component.is_truthy() {
            return Ok(false);
        }
        Ok(keys.iter().all(|k| has_property_v(&component, k)))
    })
}

pub fn by_props(props: &[&str]) -> Filter {
    by_keys(props)
}

pub fn by_display_name(name: &str) -> Filter {
    let name = name.to_string();
    Filter::new(move |module, _| {
        if !module.is_truthy() {
            return Ok(false);
        }
        Ok(get_optional(module, "displayName")?.as_str() == Some(name.as_str()))
    })
}

/// Flux stores: a `_dispatchToken` and a `getName()` returning `name`.
pub fn by_store_name(name: &str) -> Filter {
    let name = name.to_string();
    Filter::new(move |module, _| {
        if !get_optional(module, "_dispatchToken")?.is_truthy() {
            return Ok(false);
        }
        let get_name = get_optional(module, "getName")?;
        match get_name.as_object() {
            Some(f) if get_name.is_callable() => {
                let result = call_function(f, module, &mut Vec::new())?;
                Ok(result.as_str() == Some(name.as_str()))
            }
            _ => Ok(false),
        }
    })
}

/// A function whose source text contains every string.
pub fn by_strings(strings: &[&str]) -> Filter {
    let strings = owned(strings);
    Filter::simple(move |module| match module.as_object() {
        Some(f) if module.is_callable() => match function_to_string(f) {
            Ok(source) => strings.iter().all(|s| source.contains(s.as_str())),
            Err(_) => false,
        },
        _ => false,
    })
}

/// The module's factory source satisfies every matcher.
pub fn by_source(matchers: Vec<SourceMatcher>) -> Filter {
    Filter::new(move |_, record| match &record.source {
        Some(source) => Ok(matchers.iter().all(|m| m.matches(source))),
        None => Ok(false),
    })
}

pub fn by_prototype_keys(fields: &[&str]) -> Filter {
    let fields = owned(fields);
    Filter::new(move |module, _| {
        let prototype = get_v(module, "prototype")?;
        if !prototype.is_truthy() {
            return Ok(false);
        }
        Ok(fields.iter().all(|f| has_property_v(&prototype, f)))
    })
}

/// The stringified module matches `regex`.
pub fn by_regex(regex: Regex) -> Filter {
    by_regex_with(
        regex,
        Rc::new(|m: &JsValue| -> Result<JsValue, JErrorType> { Ok(m.clone()) }),
    )
}

pub fn by_regex_with(regex: Regex, mapper: Mapper) -> Filter {
    Filter::new(move |module, _| {
        let method = mapper(module)?;
        if !method.is_truthy() {
            return Ok(false);
        }
        let text = match method.as_object() {
            Some(f) if method.is_callable() => function_to_string(f)?,
            _ => to_display_string(&method),
        };
        Ok(regex.is_match(&text))
    })
}

/// All filters match. Failures propagate.
pub fn combine(filters: Vec<Filter>) -> Filter {
    Filter::new(move |exports, record| {
        for f in &filters {
            if !f.test(exports, record)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

/// At least one filter matches.
pub fn any(filters: Vec<Filter>) -> Filter {
    Filter::new(move |exports, record| {
        for f in &filters {
            if f.test(exports, record)? {
                return Ok(true);
            }
        }
        Ok(false)
    })
}

pub fn not(filter: Filter) -> Filter {
    Filter::new(move |exports, record| Ok(!filter.test(exports, record)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::builder::ObjectBuilder;
    use crate::runner::webpack::registry::ModuleId;

    fn record(exports: &JsValue) -> ModuleRecord {
        ModuleRecord {
            id: ModuleId::Num(1),
            exports: exports.clone(),
            source: Some("function(e,t,n){n.d(t,{Z:()=>r})}".to_string()),
        }
    }

    #[test]
    fn test_clones_share_identity() {
        let f = by_keys(&["a"]);
        let g = f.clone();
        assert_eq!(f.id(), g.id());
        assert_ne!(f.id(), by_keys(&["a"]).id());
    }

    #[test]
    fn test_by_keys_requires_every_key() {
        let m = ObjectBuilder::new()
            .add_property("a", JsValue::from(1))
            .add_property("b", JsValue::from(2))
            .build_value();
        let r = record(&m);
        assert!(by_keys(&["a", "b"]).test(&m, &r).unwrap());
        assert!(!by_keys(&["a", "c"]).test(&m, &r).unwrap());
        assert!(!by_keys(&["a"]).test(&JsValue::from("a"), &r).unwrap());
    }

    #[test]
    fn test_by_source() {
        let m = JsValue::from(true);
        let r = record(&m);
        let hit = by_source(vec!["n.d(t".into(), Regex::new(r"Z:\(\)").unwrap().into()]);
        assert!(hit.test(&m, &r).unwrap());
        assert!(!by_source(vec!["missing".into()]).test(&m, &r).unwrap());
    }

    #[test]
    fn test_not_and_any() {
        let m = ObjectBuilder::new()
            .add_property("x", JsValue::from(1))
            .build_value();
        let r = record(&m);
        assert!(not(by_keys(&["y"])).test(&m, &r).unwrap());
        assert!(any(vec![by_keys(&["y"]), by_keys(&["x"])]).test(&m, &r).unwrap());
        assert!(!combine(vec![by_keys(&["y"]), by_keys(&["x"])]).test(&m, &r).unwrap());
    }
}
