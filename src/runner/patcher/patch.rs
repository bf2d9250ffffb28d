//! Patch records: one [`Patch`] per intercepted `(object, method)` slot,
//! holding the ordered [`ChildPatch`]es contributed by callers.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::{define_property, set};
use crate::runner::ds::value::{JsObjectType, JsValue};

pub type BeforeFn = Rc<dyn Fn(&JsValue, &mut Vec<JsValue>) -> Result<(), JErrorType>>;

/// `(this, args, original bound to this)`
pub type InsteadFn = Rc<dyn Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType>>;

/// `(this, args, current return value)`
pub type AfterFn = Rc<dyn Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchPhase {
    Before,
    Instead,
    After,
}

impl fmt::Display for PatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchPhase::Before => write!(f, "before"),
            PatchPhase::Instead => write!(f, "instead"),
            PatchPhase::After => write!(f, "after"),
        }
    }
}

#[derive(Clone)]
pub enum PatchCallback {
    Before(BeforeFn),
    Instead(InsteadFn),
    After(AfterFn),
}

impl PatchCallback {
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&JsValue, &mut Vec<JsValue>) -> Result<(), JErrorType> + 'static,
    {
        PatchCallback::Before(Rc::new(f))
    }

    pub fn instead<F>(f: F) -> Self
    where
        F: Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        PatchCallback::Instead(Rc::new(f))
    }

    pub fn after<F>(f: F) -> Self
    where
        F: Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        PatchCallback::After(Rc::new(f))
    }

    pub fn phase(&self) -> PatchPhase {
        match self {
            PatchCallback::Before(_) => PatchPhase::Before,
            PatchCallback::Instead(_) => PatchPhase::Instead,
            PatchCallback::After(_) => PatchPhase::After,
        }
    }
}

pub type SharedPatch = Rc<RefCell<Patch>>;

/// The set of patches currently installed, in creation order.
pub type ActivePatches = Rc<RefCell<Vec<SharedPatch>>>;

pub struct Patch {
    /// `Display.method`, for diagnostics only.
    pub name: String,
    pub module: JsObjectType,
    pub function_name: String,
    pub original_function: JsObjectType,
    pub proxy_function: Option<JsObjectType>,
    pub children: Vec<ChildPatch>,
    /// Next child id. Never reused within this patch.
    pub counter: usize,
}

impl Patch {
    pub fn new(
        name: String,
        module: JsObjectType,
        function_name: &str,
        original_function: JsObjectType,
    ) -> Self {
        Patch {
            name,
            module,
            function_name: function_name.to_string(),
            original_function,
            proxy_function: None,
            children: Vec::new(),
            counter: 0,
        }
    }

    pub fn is_slot(&self, module: &JsObjectType, function_name: &str) -> bool {
        Rc::ptr_eq(&self.module, module) && self.function_name == function_name
    }

    /// Children of one phase, copied so the caller can run them without
    /// holding a borrow of the patch.
    pub fn snapshot(&self, phase: PatchPhase) -> Vec<ChildPatch> {
        self.children
            .iter()
            .filter(|c| c.phase == phase)
            .cloned()
            .collect()
    }
}

#[derive(Clone)]
pub struct ChildPatch {
    pub caller: String,
    pub phase: PatchPhase,
    pub id: usize,
    pub callback: PatchCallback,
    pub unpatch: Unpatch,
}

impl fmt::Debug for ChildPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildPatch")
            .field("caller", &self.caller)
            .field("phase", &self.phase)
            .field("id", &self.id)
            .finish()
    }
}

/// Removes exactly one child patch. Calling it again, or after the patch
/// was reverted by other means, does nothing.
#[derive(Clone)]
pub struct Unpatch {
    patch: Weak<RefCell<Patch>>,
    id: usize,
    active: Weak<RefCell<Vec<SharedPatch>>>,
}

impl Unpatch {
    pub(crate) fn new(patch: &SharedPatch, id: usize, active: &ActivePatches) -> Self {
        Unpatch {
            patch: Rc::downgrade(patch),
            id,
            active: Rc::downgrade(active),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn unpatch(&self) {
        let patch = match self.patch.upgrade() {
            Some(p) => p,
            None => return,
        };
        let now_empty = {
            let mut p = patch.borrow_mut();
            let before = p.children.len();
            p.children.retain(|c| c.id != self.id);
            if p.children.len() == before {
                return;
            }
            p.children.is_empty()
        };
        if now_empty {
            if let Some(active) = self.active.upgrade() {
                revert(&patch, &active);
            }
        }
    }
}

/// Restores the original function and forgets the patch, but only while the
/// patch is still the active one for its slot.
fn revert(patch: &SharedPatch, active: &ActivePatches) {
    let position = active.borrow().iter().position(|p| Rc::ptr_eq(p, patch));
    let index = match position {
        Some(i) => i,
        None => return,
    };
    active.borrow_mut().remove(index);

    let (module, function_name, original) = {
        let mut p = patch.borrow_mut();
        p.proxy_function = None;
        (
            p.module.clone(),
            p.function_name.clone(),
            p.original_function.clone(),
        )
    };
    let original = JsValue::Object(original);
    if set(&module, &function_name, original.clone()).is_err() {
        define_property(&module, &function_name, PropertyDescriptor::new_data(original));
    }
}

impl fmt::Debug for Unpatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unpatch#{}", self.id)
    }
}
