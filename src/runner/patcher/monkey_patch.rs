//! The legacy single-callback patch helper.
//!
//! Old plugins pass one callback that receives a mutable data bag instead of
//! positional arguments. Each invocation of the patched method gets a fresh
//! [`MonkeyPatchData`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::call;
use crate::runner::ds::operations::object::{get, get_optional};
use crate::runner::ds::value::{JsObjectType, JsValue};
use crate::runner::patcher::engine::{Patcher, PatchOptions, ORIGINAL_FUNCTION_KEY};
use crate::runner::patcher::patch::{PatchCallback, PatchPhase, Unpatch};
use crate::runner::patcher::target::PatchTarget;

pub const DEFAULT_CALLER_ID: &str = "BdApi";

pub type MonkeyPatchFn = Rc<dyn Fn(&mut MonkeyPatchData) -> Result<JsValue, JErrorType>>;

pub struct MonkeyPatchData {
    pub this_object: JsValue,
    pub method_arguments: Vec<JsValue>,
    pub return_value: JsValue,
    pub original_method: JsValue,
    cancel: Rc<RefCell<Option<Unpatch>>>,
}

impl MonkeyPatchData {
    /// Runs the unpatched method with the current `this_object` and
    /// `method_arguments`, storing the result in `return_value`.
    pub fn call_original_method(&mut self) -> Result<JsValue, JErrorType> {
        let value = call(
            &self.original_method,
            &self.this_object,
            &mut self.method_arguments,
        )?;
        self.return_value = value.clone();
        Ok(value)
    }

    pub fn cancel_patch(&self) {
        cancel(&self.cancel);
    }
}

fn cancel(handle: &Rc<RefCell<Option<Unpatch>>>) {
    let unpatch = handle.borrow().clone();
    if let Some(u) = unpatch {
        u.unpatch();
    }
}

#[derive(Clone, Default)]
pub struct MonkeyPatchOptions {
    pub before: Option<MonkeyPatchFn>,
    pub after: Option<MonkeyPatchFn>,
    pub instead: Option<MonkeyPatchFn>,
    /// Remove the patch after its first invocation.
    pub once: bool,
    pub caller_id: Option<String>,
}

impl MonkeyPatchOptions {
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&mut MonkeyPatchData) -> Result<JsValue, JErrorType> + 'static,
    {
        MonkeyPatchOptions {
            before: Some(Rc::new(f)),
            ..Self::default()
        }
    }

    pub fn after<F>(f: F) -> Self
    where
        F: Fn(&mut MonkeyPatchData) -> Result<JsValue, JErrorType> + 'static,
    {
        MonkeyPatchOptions {
            after: Some(Rc::new(f)),
            ..Self::default()
        }
    }

    pub fn instead<F>(f: F) -> Self
    where
        F: Fn(&mut MonkeyPatchData) -> Result<JsValue, JErrorType> + 'static,
    {
        MonkeyPatchOptions {
            instead: Some(Rc::new(f)),
            ..Self::default()
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    /// `before` wins over `after`, which wins over `instead`.
    fn selected(&self) -> Option<(PatchPhase, MonkeyPatchFn)> {
        if let Some(f) = &self.before {
            Some((PatchPhase::Before, f.clone()))
        } else if let Some(f) = &self.after {
            Some((PatchPhase::After, f.clone()))
        } else {
            self.instead
                .as_ref()
                .map(|f| (PatchPhase::Instead, f.clone()))
        }
    }
}

impl Patcher {
    /// Patches `what[method]` with the single callback in `options`.
    ///
    /// The callback's non-`undefined` result becomes the return value for
    /// `after` and `instead`; otherwise `data.return_value` is used. A
    /// failing callback is logged and leaves the call alone.
    pub fn monkey_patch(
        &self,
        what: &JsObjectType,
        method: &str,
        options: MonkeyPatchOptions,
    ) -> Option<Unpatch> {
        let (phase, callback) = match options.selected() {
            Some(s) => s,
            None => {
                self.logger().err(
                    DEFAULT_CALLER_ID,
                    "Must provide one of: after, before, instead",
                    None,
                );
                return None;
            }
        };
        let caller_id = options
            .caller_id
            .clone()
            .unwrap_or_else(|| DEFAULT_CALLER_ID.to_string());
        let handle: Rc<RefCell<Option<Unpatch>>> = Rc::new(RefCell::new(None));

        let run = {
            let handle = handle.clone();
            let logger = self.logger().clone();
            let scope = format!("{}:monkeyPatch", caller_id);
            let message = format!("Error in the {} of {}", phase, method);
            let once = options.once;
            let what = what.clone();
            let method = method.to_string();
            move |this: &JsValue, args: &mut Vec<JsValue>, return_value: JsValue| -> JsValue {
                let mut data = MonkeyPatchData {
                    this_object: this.clone(),
                    method_arguments: args.clone(),
                    return_value,
                    original_method: unpatched_method(&what, &method),
                    cancel: handle.clone(),
                };
                let result = callback(&mut data);
                *args = data.method_arguments.clone();
                match result {
                    Ok(value) => {
                        if once {
                            data.cancel_patch();
                        }
                        if value.is_undefined() {
                            data.return_value
                        } else {
                            value
                        }
                    }
                    Err(e) => {
                        logger.err(&scope, &message, Some(&e));
                        JsValue::Undefined
                    }
                }
            }
        };

        let callback = match phase {
            PatchPhase::Before => PatchCallback::before(move |this, args| {
                run(this, args, JsValue::Undefined);
                Ok(())
            }),
            PatchPhase::After => PatchCallback::after(move |this, args, ret| {
                Ok(run(this, args, ret.clone()))
            }),
            PatchPhase::Instead => PatchCallback::instead(move |this, args, _bound| {
                Ok(run(this, args, JsValue::Undefined))
            }),
        };
        let unpatch = self.push_child_patch(
            &caller_id,
            &PatchTarget::from(what),
            method,
            callback,
            &PatchOptions::default(),
        )?;
        *handle.borrow_mut() = Some(unpatch.clone());
        Some(unpatch)
    }
}

/// The slot's function as it was before any patch.
fn unpatched_method(what: &JsObjectType, method: &str) -> JsValue {
    let current = get(what, method).unwrap_or(JsValue::Undefined);
    match get_optional(&current, ORIGINAL_FUNCTION_KEY) {
        Ok(original) if original.is_callable() => original,
        _ => current,
    }
}
