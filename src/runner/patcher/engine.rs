//! The patch engine.
//!
//! Every intercepted `(object, method)` slot holds exactly one proxy built by
//! [`make_override`]. Callers add `before`, `instead` and `after` children
//! to that proxy and remove them independently through the [`Unpatch`]
//! handle each registration returns. Removing the last child puts the
//! original function back.
//!
//! ```
//! use bdshim::runner::ds::builder::ObjectBuilder;
//! use bdshim::runner::ds::function_object::call;
//! use bdshim::runner::ds::operations::object::get;
//! use bdshim::runner::ds::value::JsValue;
//! use bdshim::runner::logger::TracingLogger;
//! use bdshim::runner::patcher::engine::Patcher;
//! use std::rc::Rc;
//!
//! let target = ObjectBuilder::new()
//!     .add_method("greet", |_this, args| Ok(JsValue::from(format!("Hi {}", args[0]))))
//!     .build();
//! let patcher = Patcher::new(Rc::new(TracingLogger));
//! let unpatch = patcher
//!     .after("Doc", &target, "greet", |_this, _args, ret| Ok(JsValue::from(format!("{}!", ret))))
//!     .unwrap();
//!
//! let greet = get(&target, "greet").unwrap();
//! let out = call(&greet, &JsValue::Object(target.clone()), &mut vec![JsValue::from("bob")]).unwrap();
//! assert_eq!(out, JsValue::from("Hi bob!"));
//! unpatch.unpatch();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{function_to_string, new_native_function, noop_function};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::{assign, define_property, get, get_optional, set};
use crate::runner::ds::value::{JsObjectType, JsValue};
use crate::runner::logger::SharedLogger;
use crate::runner::patcher::dispatch::{make_override, PATCHER_LOG_SCOPE};
use crate::runner::patcher::patch::{
    ActivePatches, ChildPatch, Patch, PatchCallback, SharedPatch, Unpatch,
};
use crate::runner::patcher::target::PatchTarget;
use crate::runner::plugin::registry::KnownModules;
use crate::runner::webpack::resolver::SharedResolver;

pub const ORIGINAL_FUNCTION_KEY: &str = "__originalFunction";

#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Install a no-op method when the slot is empty. `None` uses the
    /// patcher's default.
    pub force_patch: Option<bool>,
    /// Name used in diagnostics instead of the derived one.
    pub display_name: Option<String>,
}

impl PatchOptions {
    pub fn force_patch(mut self, force: bool) -> Self {
        self.force_patch = Some(force);
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Children to remove: everything a caller registered, or an explicit list.
#[derive(Debug, Clone)]
pub enum UnpatchTarget {
    Caller(String),
    Patches(Vec<ChildPatch>),
}

impl From<&str> for UnpatchTarget {
    fn from(caller: &str) -> Self {
        UnpatchTarget::Caller(caller.to_string())
    }
}

impl From<String> for UnpatchTarget {
    fn from(caller: String) -> Self {
        UnpatchTarget::Caller(caller)
    }
}

impl From<Vec<ChildPatch>> for UnpatchTarget {
    fn from(patches: Vec<ChildPatch>) -> Self {
        UnpatchTarget::Patches(patches)
    }
}

pub struct Patcher {
    patches: ActivePatches,
    known: RefCell<KnownModules>,
    resolver: Option<SharedResolver>,
    logger: SharedLogger,
    force_patch: bool,
}

pub type SharedPatcher = Rc<Patcher>;

impl Patcher {
    pub fn new(logger: SharedLogger) -> Self {
        Patcher {
            patches: Rc::new(RefCell::new(Vec::new())),
            known: RefCell::new(KnownModules::new()),
            resolver: None,
            logger,
            force_patch: true,
        }
    }

    /// Enables [`PatchTarget::ByProperties`] targets.
    pub fn with_resolver(mut self, resolver: SharedResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_force_patch(mut self, force_patch: bool) -> Self {
        self.force_patch = force_patch;
        self
    }

    /// Installs the known-module table used by [`PatchTarget::ByKnownName`].
    pub fn setup(&self, known: KnownModules) {
        *self.known.borrow_mut() = known;
    }

    pub fn known_modules(&self) -> KnownModules {
        self.known.borrow().clone()
    }

    pub fn before<F>(
        &self,
        caller: &str,
        target: impl Into<PatchTarget>,
        method: &str,
        callback: F,
    ) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>) -> Result<(), JErrorType> + 'static,
    {
        self.before_with(caller, target, method, callback, &PatchOptions::default())
    }

    pub fn before_with<F>(
        &self,
        caller: &str,
        target: impl Into<PatchTarget>,
        method: &str,
        callback: F,
        options: &PatchOptions,
    ) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>) -> Result<(), JErrorType> + 'static,
    {
        self.push_child_patch(
            caller,
            &target.into(),
            method,
            PatchCallback::before(callback),
            options,
        )
    }

    pub fn instead<F>(
        &self,
        caller: &str,
        target: impl Into<PatchTarget>,
        method: &str,
        callback: F,
    ) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        self.instead_with(caller, target, method, callback, &PatchOptions::default())
    }

    pub fn instead_with<F>(
        &self,
        caller: &str,
        target: impl Into<PatchTarget>,
        method: &str,
        callback: F,
        options: &PatchOptions,
    ) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        self.push_child_patch(
            caller,
            &target.into(),
            method,
            PatchCallback::instead(callback),
            options,
        )
    }

    pub fn after<F>(
        &self,
        caller: &str,
        target: impl Into<PatchTarget>,
        method: &str,
        callback: F,
    ) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        self.after_with(caller, target, method, callback, &PatchOptions::default())
    }

    pub fn after_with<F>(
        &self,
        caller: &str,
        target: impl Into<PatchTarget>,
        method: &str,
        callback: F,
        options: &PatchOptions,
    ) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        self.push_child_patch(
            caller,
            &target.into(),
            method,
            PatchCallback::after(callback),
            options,
        )
    }

    /// Registers `callback` on `target[method]`, creating the slot's proxy on
    /// first use. Returns `None` when the target does not resolve or the
    /// slot cannot hold a function.
    pub fn push_child_patch(
        &self,
        caller: &str,
        target: &PatchTarget,
        method: &str,
        callback: PatchCallback,
        options: &PatchOptions,
    ) -> Option<Unpatch> {
        let module = {
            let known = self.known.borrow();
            target.resolve(&known, self.resolver.as_deref())?
        };

        let force_patch = options.force_patch.unwrap_or(self.force_patch);
        let current = self.read_slot(&module, method)?;
        if !current.is_truthy() && force_patch {
            if let Err(e) = set(&module, method, JsValue::Object(noop_function())) {
                self.logger.err(
                    PATCHER_LOG_SCOPE,
                    &format!("Could not install placeholder for {}", method),
                    Some(&e),
                );
                return None;
            }
        }
        let current = self.read_slot(&module, method)?;
        let original = match current {
            JsValue::Object(ref f) if current.is_callable() => f.clone(),
            _ => {
                self.logger.warn(
                    PATCHER_LOG_SCOPE,
                    &format!("Cannot patch {}: not a function", method),
                    None,
                );
                return None;
            }
        };

        let existing = self
            .patches
            .borrow()
            .iter()
            .find(|p| p.borrow().is_slot(&module, method))
            .cloned();
        let patch = match existing {
            Some(p) => p,
            None => {
                let display_name = display_name_of(&module, target, options);
                let name = format!("{}.{}", display_name, method);
                self.make_patch(name, &module, method, original)?
            }
        };

        let phase = callback.phase();
        let mut p = patch.borrow_mut();
        let id = p.counter;
        p.counter += 1;
        let unpatch = Unpatch::new(&patch, id, &self.patches);
        p.children.push(ChildPatch {
            caller: caller.to_string(),
            phase,
            id,
            callback,
            unpatch: unpatch.clone(),
        });
        Some(unpatch)
    }

    fn read_slot(&self, module: &JsObjectType, method: &str) -> Option<JsValue> {
        match get(module, method) {
            Ok(v) => Some(v),
            Err(e) => {
                self.logger.err(
                    PATCHER_LOG_SCOPE,
                    &format!("Could not read {} of target", method),
                    Some(&e),
                );
                None
            }
        }
    }

    fn make_patch(
        &self,
        name: String,
        module: &JsObjectType,
        method: &str,
        original: JsObjectType,
    ) -> Option<SharedPatch> {
        let patch = Rc::new(RefCell::new(Patch::new(
            name,
            module.clone(),
            method,
            original.clone(),
        )));
        let proxy = make_override(&patch, &self.logger);
        if let Err(e) = set(module, method, JsValue::Object(proxy.clone())) {
            self.logger.err(
                PATCHER_LOG_SCOPE,
                &format!("Could not install proxy for {}", patch.borrow().name),
                Some(&e),
            );
            return None;
        }
        if let Err(e) = assign(&proxy, &original) {
            self.logger.debug(
                PATCHER_LOG_SCOPE,
                &format!("Could not copy statics onto {}: {}", patch.borrow().name, e),
            );
        }
        define_property(
            &proxy,
            ORIGINAL_FUNCTION_KEY,
            PropertyDescriptor::new_hidden(JsValue::Object(original.clone())),
        );
        let to_string = new_native_function("toString", move |_, _| {
            function_to_string(&original).map(JsValue::from)
        });
        define_property(
            &proxy,
            "toString",
            PropertyDescriptor::new_hidden(JsValue::Object(to_string)),
        );
        patch.borrow_mut().proxy_function = Some(proxy);
        self.patches.borrow_mut().push(patch.clone());
        Some(patch)
    }

    /// Every child registered by `caller`, across all slots. An empty label
    /// owns nothing.
    pub fn get_patches_by_caller(&self, caller: &str) -> Vec<ChildPatch> {
        if caller.is_empty() {
            return Vec::new();
        }
        self.patches
            .borrow()
            .iter()
            .flat_map(|p| {
                p.borrow()
                    .children
                    .iter()
                    .filter(|c| c.caller == caller)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn unpatch_all(&self, target: impl Into<UnpatchTarget>) {
        let children = match target.into() {
            UnpatchTarget::Caller(caller) => self.get_patches_by_caller(&caller),
            UnpatchTarget::Patches(list) => list,
        };
        for child in children {
            child.unpatch.unpatch();
        }
    }

    /// Names of the currently patched slots, `Display.method`.
    pub fn active_patch_names(&self) -> Vec<String> {
        self.patches
            .borrow()
            .iter()
            .map(|p| p.borrow().name.clone())
            .collect()
    }

    pub fn is_patched(&self, module: &JsObjectType, method: &str) -> bool {
        self.patches
            .borrow()
            .iter()
            .any(|p| p.borrow().is_slot(module, method))
    }

    pub fn logger(&self) -> &SharedLogger {
        &self.logger
    }
}

/// Known-module name, explicit option, then the module's own
/// `displayName`, `name`, and its constructor's `displayName` and `name`.
fn display_name_of(module: &JsObjectType, target: &PatchTarget, options: &PatchOptions) -> String {
    if let Some(name) = target.known_name() {
        return name.to_string();
    }
    if let Some(name) = options.display_name.as_ref().filter(|n| !n.is_empty()) {
        return name.clone();
    }
    let module_value = JsValue::Object(module.clone());
    let constructor = get_optional(&module_value, "constructor").unwrap_or(JsValue::Undefined);
    let candidates = [
        (&module_value, "displayName"),
        (&module_value, "name"),
        (&constructor, "displayName"),
        (&constructor, "name"),
    ];
    for (holder, key) in candidates.iter() {
        if let Ok(JsValue::String(s)) = get_optional(holder, key) {
            if !s.is_empty() {
                return s;
            }
        }
    }
    (**module).borrow().class_name().to_string()
}
