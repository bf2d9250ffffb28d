//! Unsuffixed aliases for hashed CSS classname modules.
//!
//! Newer bundles export `{ wrapper: "wrapper_a1b2c3" }` where plugins still
//! look for `wrapper` by its bare prefix. Matching modules gain hidden,
//! frozen aliases from each prefix to its hashed value.

use std::cell::RefCell;
use std::collections::HashSet;

use indexmap::IndexMap;
use regex::Regex;

use crate::runner::ds::object::{object_id, ObjectType};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::{define_property, get, has_property, own_keys};
use crate::runner::ds::value::{JsObjectType, JsValue};

lazy_static! {
    static ref IS_CLASSNAME: Regex = Regex::new(r"^[a-zA-Z_]\w*_[a-f0-9]+$").unwrap();
    static ref EXTRACT_CLASS: Regex = Regex::new(r"^(.+?)_").unwrap();
}

const ES_MODULE_FLAG: &str = "__esModule";

/// Remembers every exports object it has aliased so each is processed at
/// most once per session. Objects that do not qualify yet are checked again
/// on the next visit.
#[derive(Debug, Default)]
pub struct ClassNamePolyfill {
    visited: RefCell<HashSet<usize>>,
}

impl ClassNamePolyfill {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, exports: &JsValue) {
        let o = match exports {
            JsValue::Object(o) if matches!(&*(**o).borrow(), ObjectType::Ordinary(_)) => o,
            _ => return,
        };
        let id = object_id(o);
        if self.visited.borrow().contains(&id) {
            return;
        }
        let aliases = match collect_aliases(o) {
            Some(aliases) => aliases,
            None => return,
        };
        self.visited.borrow_mut().insert(id);
        for (prefix, value) in aliases {
            define_property(o, &prefix, PropertyDescriptor::new_frozen_hidden(value));
        }
    }

    pub fn was_visited(&self, o: &JsObjectType) -> bool {
        self.visited.borrow().contains(&object_id(o))
    }
}

/// `None` unless every own value is a string and at least one looks like a
/// hashed classname. Later values with the same prefix win.
fn collect_aliases(o: &JsObjectType) -> Option<IndexMap<String, JsValue>> {
    let keys: Vec<String> = own_keys(o)
        .into_iter()
        .filter(|k| k != ES_MODULE_FLAG)
        .collect();
    if keys.is_empty() {
        return None;
    }
    let mut values = Vec::with_capacity(keys.len());
    let mut has_class = false;
    for key in &keys {
        match get(o, key) {
            Ok(JsValue::String(s)) => {
                if IS_CLASSNAME.is_match(&s) {
                    has_class = true;
                }
                values.push(s);
            }
            _ => return None,
        }
    }
    if !has_class {
        return None;
    }
    let mut aliases = IndexMap::new();
    for value in values {
        if let Some(prefix) = EXTRACT_CLASS.captures(&value).and_then(|c| c.get(1)) {
            let prefix = prefix.as_str();
            if has_property(o, prefix) {
                continue;
            }
            aliases.insert(prefix.to_string(), JsValue::from(value.as_str()));
        }
    }
    Some(aliases)
}
