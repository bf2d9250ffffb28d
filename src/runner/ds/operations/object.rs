//! Property access over the object model, with accessor and prototype-chain
//! semantics.
//!
//! None of these functions hold a `RefCell` borrow while a getter or setter
//! runs, so accessors are free to touch the object they belong to.

use std::collections::HashSet;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::call_function;
use crate::runner::ds::object::ObjectType;
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::type_conversion::to_display_string;
use crate::runner::ds::value::{JsObjectType, JsValue};

enum Lookup {
    Value(JsValue),
    Getter(Option<JsObjectType>),
    Prototype(Option<JsObjectType>),
}

fn lookup_own(o: &JsObjectType, property: &str) -> Lookup {
    let borrowed = (**o).borrow();
    if let ObjectType::Array(a) = &*borrowed {
        if let Some(v) = a.get_element(property) {
            return Lookup::Value(v);
        }
    }
    let base = borrowed.get_object_base();
    match base.get_own_property(property) {
        Some(PropertyDescriptor::Data { value, .. }) => Lookup::Value(value.clone()),
        Some(PropertyDescriptor::Accessor { get, .. }) => Lookup::Getter(get.clone()),
        None => Lookup::Prototype(base.get_prototype_of()),
    }
}

/// `o[property]`
pub fn get(o: &JsObjectType, property: &str) -> Result<JsValue, JErrorType> {
    let receiver = JsValue::Object(o.clone());
    let mut current = o.clone();
    loop {
        match lookup_own(&current, property) {
            Lookup::Value(v) => return Ok(v),
            Lookup::Getter(None) => return Ok(JsValue::Undefined),
            Lookup::Getter(Some(getter)) => {
                return call_function(&getter, &receiver, &mut Vec::new())
            }
            Lookup::Prototype(None) => return Ok(JsValue::Undefined),
            Lookup::Prototype(Some(p)) => current = p,
        }
    }
}

/// `v[property]` for any value. Reading from `undefined`/`null` throws,
/// primitives other than strings have no properties here.
pub fn get_v(v: &JsValue, property: &str) -> Result<JsValue, JErrorType> {
    match v {
        JsValue::Object(o) => get(o, property),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read properties of {} (reading '{}')",
            to_display_string(v),
            property
        ))),
        JsValue::String(s) if property == "length" => Ok(JsValue::from(s.chars().count() as i64)),
        _ => Ok(JsValue::Undefined),
    }
}

/// `v?.[property]`
pub fn get_optional(v: &JsValue, property: &str) -> Result<JsValue, JErrorType> {
    if v.is_nullish() {
        Ok(JsValue::Undefined)
    } else {
        get_v(v, property)
    }
}

/// `o[property] = value` in strict mode.
pub fn set(o: &JsObjectType, property: &str, value: JsValue) -> Result<(), JErrorType> {
    let setter = {
        let mut borrowed = (*o).borrow_mut();
        if let Some(a) = borrowed.as_array_mut() {
            if a.set_element(property, value.clone()) {
                return Ok(());
            }
        }
        let base = borrowed.get_object_base_mut();
        match base.get_own_property(property) {
            Some(PropertyDescriptor::Accessor { set: Some(s), .. }) => Some(s.clone()),
            Some(PropertyDescriptor::Accessor { set: None, .. }) => {
                return Err(JErrorType::TypeError(format!(
                    "Cannot set property {} which has only a getter",
                    property
                )))
            }
            Some(PropertyDescriptor::Data { writable, .. }) => {
                if !*writable {
                    return Err(JErrorType::TypeError(format!(
                        "Cannot assign to read only property '{}'",
                        property
                    )));
                }
                base.write_data_value(property, value);
                return Ok(());
            }
            None => {
                if !base.define_own_property(property, PropertyDescriptor::new_data(value)) {
                    return Err(JErrorType::TypeError(format!(
                        "Cannot add property {}, object is not extensible",
                        property
                    )));
                }
                return Ok(());
            }
        }
    };
    match setter {
        Some(s) => {
            call_function(&s, &JsValue::Object(o.clone()), &mut vec![value])?;
            Ok(())
        }
        None => Ok(()),
    }
}

/// `property in o`
pub fn has_property(o: &JsObjectType, property: &str) -> bool {
    let mut current = o.clone();
    loop {
        let next = {
            let borrowed = (*current).borrow();
            if let ObjectType::Array(a) = &*borrowed {
                if a.has_element(property) {
                    return true;
                }
            }
            let base = borrowed.get_object_base();
            if base.has_own_property(property) {
                return true;
            }
            base.get_prototype_of()
        };
        match next {
            Some(p) => current = p,
            None => return false,
        }
    }
}

/// `property in v`, `false` for primitives.
pub fn has_property_v(v: &JsValue, property: &str) -> bool {
    match v {
        JsValue::Object(o) => has_property(o, property),
        _ => false,
    }
}

pub fn has_own_property(o: &JsObjectType, property: &str) -> bool {
    let borrowed = (*o).borrow();
    if let ObjectType::Array(a) = &*borrowed {
        if a.has_element(property) {
            return true;
        }
    }
    borrowed.get_object_base().has_own_property(property)
}

/// `Object.keys(o)`
pub fn own_keys(o: &JsObjectType) -> Vec<String> {
    let borrowed = (*o).borrow();
    let mut keys = match &*borrowed {
        ObjectType::Array(a) => a.index_keys(),
        _ => Vec::new(),
    };
    keys.extend(borrowed.get_object_base().own_enumerable_keys());
    keys
}

/// Keys a `for..in` loop visits: own enumerable keys, then enumerable keys
/// inherited along the prototype chain. A key shadowed by a nearer property,
/// enumerable or not, is skipped.
pub fn for_in_keys(o: &JsObjectType) -> Vec<String> {
    let mut keys = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(o.clone());
    while let Some(obj) = current {
        for key in own_keys(&obj) {
            if !seen.contains(&key) {
                keys.push(key);
            }
        }
        let borrowed = (*obj).borrow();
        let base = borrowed.get_object_base();
        seen.extend(base.own_property_keys());
        seen.extend(keys.iter().cloned());
        current = base.get_prototype_of();
    }
    keys
}

/// `Object.defineProperty(o, property, descriptor)`; `false` when the
/// existing property is locked.
pub fn define_property(o: &JsObjectType, property: &str, descriptor: PropertyDescriptor) -> bool {
    (*o)
        .borrow_mut()
        .get_object_base_mut()
        .define_own_property(property, descriptor)
}

/// `Object.assign(target, source)`: copies enumerable own properties through
/// `get` / `set`.
pub fn assign(target: &JsObjectType, source: &JsObjectType) -> Result<(), JErrorType> {
    for key in own_keys(source) {
        let value = get(source, &key)?;
        set(target, &key, value)?;
    }
    Ok(())
}
