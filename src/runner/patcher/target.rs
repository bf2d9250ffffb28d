use crate::runner::ds::value::{JsObjectType, JsValue};
use crate::runner::plugin::registry::KnownModules;
use crate::runner::webpack::resolver::ModuleResolver;

/// How a patch call names the object that owns the method.
#[derive(Debug, Clone)]
pub enum PatchTarget {
    /// A name in the known-module table.
    ByKnownName(String),
    /// The first module having all of these properties.
    ByProperties(Vec<String>),
    Direct(JsValue),
}

impl PatchTarget {
    pub fn by_properties(props: &[&str]) -> Self {
        PatchTarget::ByProperties(props.iter().map(|p| p.to_string()).collect())
    }

    /// The owning object, or `None` when the target does not resolve to one.
    /// Nothing is cached: each call consults the table and the resolver anew.
    pub fn resolve(
        &self,
        known: &KnownModules,
        resolver: Option<&ModuleResolver>,
    ) -> Option<JsObjectType> {
        let value = match self {
            PatchTarget::ByKnownName(name) => known.get(name)?,
            PatchTarget::ByProperties(props) => {
                let props: Vec<&str> = props.iter().map(String::as_str).collect();
                resolver?.get_by_keys(&props)?
            }
            PatchTarget::Direct(v) => v.clone(),
        };
        match value {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn known_name(&self) -> Option<&str> {
        match self {
            PatchTarget::ByKnownName(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for PatchTarget {
    fn from(name: &str) -> Self {
        PatchTarget::ByKnownName(name.to_string())
    }
}

impl From<String> for PatchTarget {
    fn from(name: String) -> Self {
        PatchTarget::ByKnownName(name)
    }
}

impl From<Vec<&str>> for PatchTarget {
    fn from(props: Vec<&str>) -> Self {
        PatchTarget::by_properties(&props)
    }
}

impl From<JsValue> for PatchTarget {
    fn from(v: JsValue) -> Self {
        PatchTarget::Direct(v)
    }
}

impl From<JsObjectType> for PatchTarget {
    fn from(o: JsObjectType) -> Self {
        PatchTarget::Direct(JsValue::Object(o))
    }
}

impl From<&JsObjectType> for PatchTarget {
    fn from(o: &JsObjectType) -> Self {
        PatchTarget::Direct(JsValue::Object(o.clone()))
    }
}
