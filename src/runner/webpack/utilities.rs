//! Lookups layered on top of [`ModuleResolver::get_module`].

use std::rc::Rc;

use indexmap::IndexMap;

use crate::runner::ds::array_object::new_array;
use crate::runner::ds::error::ShimError;
use crate::runner::ds::function_object::new_native_function;
use crate::runner::ds::object::new_object;
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::{define_property, get, own_keys, set};
use crate::runner::ds::value::{JsObjectType, JsValue};
use crate::runner::webpack::filters::Filter;
use crate::runner::webpack::registry::{ModuleId, ModuleRecord};
use crate::runner::webpack::resolver::{ModuleMatch, ModuleResolver, SearchOptions};

/// Friendly name paired with the filter recognising the minified export.
pub type KeyMapper = (String, Filter);

pub const MANGLED_MODULE_KEY: &str = "__mangledModule";

/// One query of a [`ModuleResolver::get_bulk`] call.
#[derive(Debug, Clone)]
pub struct BulkQuery {
    pub filter: Filter,
    pub options: SearchOptions,
    /// Collect every match into an array.
    pub all: bool,
    /// A miss fails the whole call.
    pub fatal: bool,
    /// Map the found module's minified keys, as [`ModuleResolver::get_mangled`].
    pub map: Option<Vec<KeyMapper>>,
}

impl BulkQuery {
    pub fn new(filter: Filter) -> Self {
        BulkQuery {
            filter,
            options: SearchOptions::default(),
            all: false,
            fatal: false,
            map: None,
        }
    }

    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn map(mut self, mappers: Vec<KeyMapper>) -> Self {
        self.map = Some(mappers);
        self
    }
}

impl ModuleResolver {
    /// The module registered under `id`, when its exports are a plain object.
    pub fn get_by_id(&self, id: &ModuleId, raw: bool) -> Option<ModuleMatch> {
        let record = self.registry().get(id)?;
        let exports_is_object = record.exports.is_object_like() && !record.exports.is_callable();
        if !exports_is_object {
            return None;
        }
        Some(if raw {
            ModuleMatch::Raw(record)
        } else {
            ModuleMatch::Exports(record.exports.clone())
        })
    }

    pub fn get_by_id_fatal(&self, id: &ModuleId, raw: bool) -> Result<ModuleMatch, ShimError> {
        self.get_by_id(id, raw)
            .ok_or_else(|| ShimError::ModuleNotFound(id.to_string()))
    }

    /// Finds the module holding an export that satisfies `filter` and
    /// returns its exports together with that export's key. The key is
    /// `None` when the exports object matched as a whole.
    pub fn get_module_with_key(&self, filter: &Filter) -> Option<(JsValue, Option<String>)> {
        let options = SearchOptions::default().raw().search_exports();
        let record = self.get_module(filter, &options)?.into_matches().into_iter().next()?;
        let record = record.record()?.clone();
        let key = match record.exports.as_object() {
            Some(o) => own_keys(o).into_iter().find(|k| {
                get(o, k)
                    .map(|v| v.is_object_like() && self.guarded_test(filter, &v, &record))
                    .unwrap_or(false)
            }),
            None => None,
        };
        Some((record.exports.clone(), key))
    }

    /// Finds a module and exposes its minified exports under friendly names.
    ///
    /// Each mapped name is an accessor on the returned object that reads
    /// from and writes to the live module. Names no export satisfied are
    /// frozen `undefined`. A missing module yields an empty object.
    pub fn get_mangled(&self, filter: &Filter, mappers: &[KeyMapper]) -> JsObjectType {
        let options = SearchOptions::default().raw();
        match self.get_module(filter, &options).and_then(|r| r.into_matches().into_iter().next()) {
            Some(m) => match m.record() {
                Some(record) => map_mangled_object(record, mappers),
                None => new_object(),
            },
            None => new_object(),
        }
    }

    /// Runs several queries in one call, in order. `all` queries yield an
    /// array, mapped queries a mangled view, others the match or
    /// `undefined`. A fatal query that misses fails the call.
    pub fn get_bulk(&self, queries: &[BulkQuery]) -> Result<Vec<JsValue>, ShimError> {
        queries.iter().map(|q| self.run_bulk_query(q)).collect()
    }

    /// [`get_bulk`](Self::get_bulk) with results keyed by name.
    pub fn get_bulk_keyed(
        &self,
        queries: &[(String, BulkQuery)],
    ) -> Result<IndexMap<String, JsValue>, ShimError> {
        let mut out = IndexMap::new();
        for (name, query) in queries {
            out.insert(name.clone(), self.run_bulk_query(query)?);
        }
        Ok(out)
    }

    fn run_bulk_query(&self, query: &BulkQuery) -> Result<JsValue, ShimError> {
        if query.all {
            let options = SearchOptions {
                first: false,
                ..query.options
            };
            let values = self
                .get_module(&query.filter, &options)
                .map(|r| r.into_values())
                .unwrap_or_default();
            if query.fatal && values.is_empty() {
                return Err(ShimError::ModuleSearchFailed);
            }
            return Ok(JsValue::Object(new_array(values)));
        }
        let options = SearchOptions {
            first: true,
            ..query.options
        };
        if let Some(mappers) = &query.map {
            let found = self
                .get_module(&query.filter, &options.raw())
                .and_then(|r| r.into_matches().into_iter().next());
            return match found.as_ref().and_then(|m| m.record()) {
                Some(record) => Ok(JsValue::Object(map_mangled_object(record, mappers))),
                None if query.fatal => Err(ShimError::ModuleSearchFailed),
                None => Ok(JsValue::Object(new_object())),
            };
        }
        match self.get_module(&query.filter, &options) {
            Some(r) => Ok(r.first_value().unwrap_or(JsValue::Undefined)),
            None if query.fatal => Err(ShimError::ModuleSearchFailed),
            None => Ok(JsValue::Undefined),
        }
    }
}

fn map_mangled_object(record: &Rc<ModuleRecord>, mappers: &[KeyMapper]) -> JsObjectType {
    let mapped = new_object();
    let module = match record.exports.as_object() {
        Some(o) => o.clone(),
        None => return mapped,
    };
    let mut remaining: Vec<&KeyMapper> = mappers.iter().collect();
    for key in own_keys(&module) {
        let value = match get(&module, &key) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let position = remaining
            .iter()
            .position(|(_, filter)| filter.test(&value, record).unwrap_or(false));
        if let Some(i) = position {
            let (name, _) = remaining.remove(i);
            define_property(&mapped, name, write_through(&module, &key));
        }
    }
    for (name, _) in remaining {
        define_property(
            &mapped,
            name,
            PropertyDescriptor::Data {
                value: JsValue::Undefined,
                writable: false,
                enumerable: true,
                configurable: false,
            },
        );
    }
    define_property(
        &mapped,
        MANGLED_MODULE_KEY,
        PropertyDescriptor::new_frozen_hidden(JsValue::Object(module)),
    );
    mapped
}

fn write_through(module: &JsObjectType, key: &str) -> PropertyDescriptor {
    let getter = {
        let module = module.clone();
        let key = key.to_string();
        new_native_function("get", move |_, _| get(&module, &key))
    };
    let setter = {
        let module = module.clone();
        let key = key.to_string();
        new_native_function("set", move |_, args| {
            let value = args.first().cloned().unwrap_or(JsValue::Undefined);
            set(&module, &key, value)?;
            Ok(JsValue::Undefined)
        })
    };
    PropertyDescriptor::new_accessor(Some(getter), Some(setter), true)
}
