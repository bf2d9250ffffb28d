use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::runner::ds::array_object::ArrayObject;
use crate::runner::ds::function_object::FunctionObject;
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::value::{JsObjectType, JsValue};

/// Host globals the module resolver must never hand to a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Window,
    Document,
    DomTokenList,
    Symbol,
}

pub struct HostObject {
    pub kind: HostKind,
    pub object_base: ObjectBase,
}

pub struct TypedArrayObject {
    pub bytes: Vec<u8>,
    pub object_base: ObjectBase,
}

pub enum ObjectType {
    Ordinary(ObjectBase),
    Function(FunctionObject),
    Array(ArrayObject),
    TypedArray(TypedArrayObject),
    Host(HostObject),
}
impl ObjectType {
    pub fn is_callable(&self) -> bool {
        matches!(self, ObjectType::Function(_))
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ObjectType::Ordinary(_) => "Object",
            ObjectType::Function(_) => "Function",
            ObjectType::Array(_) => "Array",
            ObjectType::TypedArray(_) => "Uint8Array",
            ObjectType::Host(h) => match h.kind {
                HostKind::Window => "Window",
                HostKind::Document => "HTMLHtmlElement",
                HostKind::DomTokenList => "DOMTokenList",
                HostKind::Symbol => "Symbol",
            },
        }
    }

    pub fn get_object_base(&self) -> &ObjectBase {
        match self {
            ObjectType::Ordinary(o) => o,
            ObjectType::Function(f) => &f.object_base,
            ObjectType::Array(a) => &a.object_base,
            ObjectType::TypedArray(t) => &t.object_base,
            ObjectType::Host(h) => &h.object_base,
        }
    }

    pub fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        match self {
            ObjectType::Ordinary(o) => o,
            ObjectType::Function(f) => &mut f.object_base,
            ObjectType::Array(a) => &mut a.object_base,
            ObjectType::TypedArray(t) => &mut t.object_base,
            ObjectType::Host(h) => &mut h.object_base,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionObject> {
        match self {
            ObjectType::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayObject> {
        match self {
            ObjectType::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayObject> {
        match self {
            ObjectType::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn host_kind(&self) -> Option<HostKind> {
        match self {
            ObjectType::Host(h) => Some(h.kind),
            _ => None,
        }
    }

    pub fn is_typed_array(&self) -> bool {
        matches!(self, ObjectType::TypedArray(_))
    }
}

pub struct ObjectBase {
    properties: IndexMap<String, PropertyDescriptor>,
    is_extensible: bool,
    prototype: Option<JsObjectType>,
}
impl ObjectBase {
    pub fn new() -> Self {
        ObjectBase {
            properties: IndexMap::new(),
            is_extensible: true,
            prototype: None,
        }
    }

    pub fn with_prototype(prototype: JsObjectType) -> Self {
        ObjectBase {
            properties: IndexMap::new(),
            is_extensible: true,
            prototype: Some(prototype),
        }
    }

    pub fn get_prototype_of(&self) -> Option<JsObjectType> {
        self.prototype.clone()
    }

    pub fn is_extensible(&self) -> bool {
        self.is_extensible
    }

    pub fn prevent_extensions(&mut self) {
        self.is_extensible = false;
    }

    pub fn get_own_property(&self, property: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(property)
    }

    pub fn has_own_property(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    /// Installs `descriptor`, keeping the original insertion position of an
    /// existing key. Non-configurable properties cannot be redefined.
    pub fn define_own_property(&mut self, property: &str, descriptor: PropertyDescriptor) -> bool {
        match self.properties.get_mut(property) {
            Some(current) => {
                if !current.is_configurable() {
                    return false;
                }
                *current = descriptor;
                true
            }
            None => {
                if !self.is_extensible {
                    return false;
                }
                self.properties.insert(property.to_string(), descriptor);
                true
            }
        }
    }

    /// Replaces the value of a writable data property in place, configurable
    /// or not.
    pub fn write_data_value(&mut self, property: &str, new_value: JsValue) -> bool {
        match self.properties.get_mut(property) {
            Some(PropertyDescriptor::Data {
                value,
                writable: true,
                ..
            }) => {
                *value = new_value;
                true
            }
            _ => false,
        }
    }

    pub fn delete(&mut self, property: &str) -> bool {
        match self.properties.get(property) {
            None => true,
            Some(pd) => {
                if pd.is_configurable() {
                    self.properties.shift_remove(property);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// All own keys, enumerable or not, in insertion order.
    pub fn own_property_keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    pub fn own_enumerable_keys(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|(_, pd)| pd.is_enumerable())
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl Default for ObjectBase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn new_object() -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::Ordinary(ObjectBase::new())))
}

pub fn new_object_with_prototype(prototype: JsObjectType) -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::Ordinary(ObjectBase::with_prototype(
        prototype,
    ))))
}

pub fn new_host_object(kind: HostKind) -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::Host(HostObject {
        kind,
        object_base: ObjectBase::new(),
    })))
}

pub fn new_typed_array(bytes: Vec<u8>) -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::TypedArray(TypedArrayObject {
        bytes,
        object_base: ObjectBase::new(),
    })))
}

/// Stable identity of a heap object for side tables. Only meaningful while
/// the object is alive.
pub fn object_id(o: &JsObjectType) -> usize {
    Rc::as_ptr(o) as *const () as usize
}
