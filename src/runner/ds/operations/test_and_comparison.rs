use std::rc::Rc;

use crate::runner::ds::value::{JsNumberType, JsObjectType, JsValue};

fn number_as_f64(n: &JsNumberType) -> f64 {
    match n {
        JsNumberType::Integer(i) => *i as f64,
        JsNumberType::Float(f) => *f,
        JsNumberType::NaN => f64::NAN,
        JsNumberType::PositiveInfinity => f64::INFINITY,
        JsNumberType::NegativeInfinity => f64::NEG_INFINITY,
    }
}

/// `a === b`
pub fn strict_equals(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(na), JsValue::Number(nb)) => number_as_f64(na) == number_as_f64(nb),
        _ => a == b,
    }
}

/// `Object.is(a, b)`: like `===` except `NaN` equals itself.
pub fn same_value(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(JsNumberType::NaN), JsValue::Number(JsNumberType::NaN)) => true,
        _ => strict_equals(a, b),
    }
}

pub fn same_object(a: &JsObjectType, b: &JsObjectType) -> bool {
    Rc::ptr_eq(a, b)
}
