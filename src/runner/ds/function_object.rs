use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{ObjectBase, ObjectType};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::type_conversion::to_display_string;
use crate::runner::ds::value::{JsObjectType, JsValue};

/// Call signature of every callable in the value model. `args` is the
/// `arguments` object: callees may rewrite it in place.
pub type NativeFn = Rc<dyn Fn(&JsValue, &mut Vec<JsValue>) -> Result<JsValue, JErrorType>>;

pub struct FunctionObject {
    behaviour: NativeFn,
    source: String,
    pub object_base: ObjectBase,
}
impl FunctionObject {
    pub fn behaviour(&self) -> NativeFn {
        self.behaviour.clone()
    }

    /// Source text as `Function.prototype.toString` would print it.
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn native_source(name: &str) -> String {
    format!("function {}() {{ [native code] }}", name)
}

pub fn new_function_with_source<F>(name: &str, source: impl Into<String>, f: F) -> JsObjectType
where
    F: Fn(&JsValue, &mut Vec<JsValue>) -> Result<JsValue, JErrorType> + 'static,
{
    let mut object_base = ObjectBase::new();
    object_base.define_own_property(
        "name",
        PropertyDescriptor::Data {
            value: JsValue::String(name.to_string()),
            writable: false,
            enumerable: false,
            configurable: true,
        },
    );
    Rc::new(RefCell::new(ObjectType::Function(FunctionObject {
        behaviour: Rc::new(f),
        source: source.into(),
        object_base,
    })))
}

pub fn new_native_function<F>(name: &str, f: F) -> JsObjectType
where
    F: Fn(&JsValue, &mut Vec<JsValue>) -> Result<JsValue, JErrorType> + 'static,
{
    new_function_with_source(name, native_source(name), f)
}

/// `function () { }`
pub fn noop_function() -> JsObjectType {
    new_function_with_source("", "function () { }", |_, _| Ok(JsValue::Undefined))
}

/// A constructor-like function whose `prototype` property is `prototype`,
/// with `prototype.constructor` pointing back at it.
pub fn new_class(name: &str, source: impl Into<String>, prototype: JsObjectType) -> JsObjectType {
    let class = new_function_with_source(name, source, |_, _| Ok(JsValue::Undefined));
    (*class).borrow_mut().get_object_base_mut().define_own_property(
        "prototype",
        PropertyDescriptor::new_hidden(JsValue::Object(prototype.clone())),
    );
    (*prototype).borrow_mut().get_object_base_mut().define_own_property(
        "constructor",
        PropertyDescriptor::new_hidden(JsValue::Object(class.clone())),
    );
    class
}

pub fn call_function(
    f: &JsObjectType,
    this: &JsValue,
    args: &mut Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    // The borrow must end before the callee runs; it may touch `f` itself.
    let behaviour = match (**f).borrow().as_function() {
        Some(func) => func.behaviour(),
        None => {
            return Err(JErrorType::TypeError(format!(
                "{} is not a function",
                (**f).borrow().class_name()
            )))
        }
    };
    behaviour(this, args)
}

pub fn call(f: &JsValue, this: &JsValue, args: &mut Vec<JsValue>) -> Result<JsValue, JErrorType> {
    match f {
        JsValue::Object(o) => call_function(o, this, args),
        other => Err(JErrorType::TypeError(format!(
            "{} is not a function",
            to_display_string(other)
        ))),
    }
}

/// `f.bind(this)`
pub fn bind_function(f: &JsObjectType, this: JsValue) -> JsObjectType {
    let name = match (**f).borrow().get_object_base().get_own_property("name") {
        Some(PropertyDescriptor::Data {
            value: JsValue::String(s),
            ..
        }) => format!("bound {}", s),
        _ => "bound ".to_string(),
    };
    let target = f.clone();
    new_function_with_source(&name, "function () { [native code] }", move |_, args| {
        call_function(&target, &this, args)
    })
}

/// `String(f)`. An own callable `toString` property wins over the stored
/// source text.
pub fn function_to_string(f: &JsObjectType) -> Result<String, JErrorType> {
    let (own_to_string, source) = {
        let borrowed = (**f).borrow();
        let own = match borrowed.get_object_base().get_own_property("toString") {
            Some(PropertyDescriptor::Data { value, .. }) if value.is_callable() => {
                Some(value.clone())
            }
            _ => None,
        };
        let source = borrowed.as_function().map(|func| func.source().to_string());
        (own, source)
    };
    match own_to_string {
        Some(to_string) => {
            let result = call(&to_string, &JsValue::Object(f.clone()), &mut Vec::new())?;
            Ok(to_display_string(&result))
        }
        None => Ok(source.unwrap_or_else(|| "[object Object]".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_and_mutate_arguments() {
        let f = new_native_function("shout", |_, args| {
            args[0] = JsValue::from("changed");
            Ok(JsValue::from(args.len() as i64))
        });
        let mut args = vec![JsValue::from("a"), JsValue::from("b")];
        let r = call_function(&f, &JsValue::Undefined, &mut args).unwrap();
        assert_eq!(r, JsValue::from(2));
        assert_eq!(args[0], JsValue::from("changed"));
    }

    #[test]
    fn test_bound_function_keeps_this() {
        let f = new_native_function("who", |this, _| Ok(this.clone()));
        let bound = bind_function(&f, JsValue::from("me"));
        let r = call_function(&bound, &JsValue::Null, &mut Vec::new()).unwrap();
        assert_eq!(r, JsValue::from("me"));
    }

    #[test]
    fn test_to_string_prefers_own_property() {
        let f = new_function_with_source("f", "function f() { return 1; }", |_, _| {
            Ok(JsValue::Undefined)
        });
        assert_eq!(function_to_string(&f).unwrap(), "function f() { return 1; }");
        let replacement = new_native_function("toString", |_, _| Ok(JsValue::from("patched")));
        (*f).borrow_mut().get_object_base_mut().define_own_property(
            "toString",
            PropertyDescriptor::new_hidden(JsValue::Object(replacement)),
        );
        assert_eq!(function_to_string(&f).unwrap(), "patched");
    }

    #[test]
    fn test_calling_non_function_is_type_error() {
        let r = call(&JsValue::from(3), &JsValue::Undefined, &mut Vec::new());
        assert!(matches!(r, Err(JErrorType::TypeError(_))));
    }
}
