//! Fluent construction of module-shaped objects.
//!
//! Hosts and tests describe exports the way a bundle would produce them:
//!
//! ```
//! use bdshim::runner::ds::builder::ObjectBuilder;
//! use bdshim::runner::ds::value::JsValue;
//!
//! let module = ObjectBuilder::new()
//!     .add_property("displayName", JsValue::from("Greeter"))
//!     .add_method("greet", |_this, args| {
//!         Ok(JsValue::from(format!("Hi {}", args[0])))
//!     })
//!     .build();
//! ```

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{new_function_with_source, new_native_function};
use crate::runner::ds::object::{new_object, new_object_with_prototype};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::value::{JsObjectType, JsValue};

pub struct ObjectBuilder {
    prototype: Option<JsObjectType>,
    properties: Vec<(String, PropertyDescriptor)>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        ObjectBuilder {
            prototype: None,
            properties: Vec::new(),
        }
    }

    pub fn with_prototype(mut self, prototype: JsObjectType) -> Self {
        self.prototype = Some(prototype);
        self
    }

    /// Add an enumerable property.
    pub fn add_property(mut self, name: impl Into<String>, value: JsValue) -> Self {
        self.properties
            .push((name.into(), PropertyDescriptor::new_data(value)));
        self
    }

    /// Add a non-enumerable property.
    pub fn add_hidden_property(mut self, name: impl Into<String>, value: JsValue) -> Self {
        self.properties
            .push((name.into(), PropertyDescriptor::new_hidden(value)));
        self
    }

    /// Add an enumerable native method named after its key.
    pub fn add_method<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&JsValue, &mut Vec<JsValue>) -> Result<JsValue, JErrorType> + 'static,
    {
        let name = name.into();
        let f = new_native_function(&name, func);
        self.add_property(name, JsValue::Object(f))
    }

    /// Add a method whose `toString()` yields `source`.
    pub fn add_method_with_source<F>(
        self,
        name: impl Into<String>,
        source: impl Into<String>,
        func: F,
    ) -> Self
    where
        F: Fn(&JsValue, &mut Vec<JsValue>) -> Result<JsValue, JErrorType> + 'static,
    {
        let name = name.into();
        let f = new_function_with_source(&name, source, func);
        self.add_property(name, JsValue::Object(f))
    }

    pub fn build(self) -> JsObjectType {
        let o = match self.prototype {
            Some(p) => new_object_with_prototype(p),
            None => new_object(),
        };
        {
            let mut borrowed = (*o).borrow_mut();
            let base = borrowed.get_object_base_mut();
            for (name, descriptor) in self.properties {
                base.define_own_property(&name, descriptor);
            }
        }
        o
    }

    pub fn build_value(self) -> JsValue {
        JsValue::Object(self.build())
    }
}

impl Default for ObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}
