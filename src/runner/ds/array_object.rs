use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::object::{ObjectBase, ObjectType};
use crate::runner::ds::value::{JsNumberType, JsObjectType, JsValue};

lazy_static! {
    pub static ref ARRAY_LENGTH_PROP: String = "length".to_string();
}

/// Dense array. Elements are exposed as the enumerable keys `"0".."n-1"`
/// ahead of any named properties.
pub struct ArrayObject {
    pub elements: Vec<JsValue>,
    pub object_base: ObjectBase,
}
impl ArrayObject {
    pub fn new(elements: Vec<JsValue>) -> Self {
        ArrayObject {
            elements,
            object_base: ObjectBase::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get_element(&self, property: &str) -> Option<JsValue> {
        if property == ARRAY_LENGTH_PROP.as_str() {
            return Some(JsValue::Number(JsNumberType::Integer(
                self.elements.len() as i64,
            )));
        }
        canonical_index(property).map(|idx| {
            self.elements
                .get(idx)
                .cloned()
                .unwrap_or(JsValue::Undefined)
        })
    }

    /// Returns `false` when `property` is not an index, so the caller can fall
    /// back to a named property.
    pub fn set_element(&mut self, property: &str, value: JsValue) -> bool {
        match canonical_index(property) {
            Some(idx) => {
                if idx >= self.elements.len() {
                    self.elements.resize(idx + 1, JsValue::Undefined);
                }
                self.elements[idx] = value;
                true
            }
            None => false,
        }
    }

    pub fn has_element(&self, property: &str) -> bool {
        property == ARRAY_LENGTH_PROP.as_str()
            || canonical_index(property)
                .map(|idx| idx < self.elements.len())
                .unwrap_or(false)
    }

    pub fn index_keys(&self) -> Vec<String> {
        (0..self.elements.len()).map(|i| i.to_string()).collect()
    }
}

/// `"12"` is an index, `"012"` and `"-1"` are not.
fn canonical_index(property: &str) -> Option<usize> {
    if property.is_empty() || (property.len() > 1 && property.starts_with('0')) {
        return None;
    }
    if !property.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    property.parse::<usize>().ok()
}

pub fn new_array(elements: Vec<JsValue>) -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::Array(ArrayObject::new(elements))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_index() {
        assert_eq!(canonical_index("0"), Some(0));
        assert_eq!(canonical_index("12"), Some(12));
        assert_eq!(canonical_index("012"), None);
        assert_eq!(canonical_index("-1"), None);
        assert_eq!(canonical_index("length"), None);
    }

    #[test]
    fn test_array_elements() {
        let mut a = ArrayObject::new(vec![JsValue::from(1), JsValue::from(2)]);
        assert_eq!(a.get_element("length"), Some(JsValue::from(2)));
        assert!(a.set_element("3", JsValue::from("x")));
        assert_eq!(a.len(), 4);
        assert_eq!(a.get_element("2"), Some(JsValue::Undefined));
        assert!(!a.set_element("name", JsValue::Null));
        assert_eq!(a.index_keys(), vec!["0", "1", "2", "3"]);
    }
}
