//! The aggregating proxy installed in a patched slot.

use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{bind_function, call_function, new_native_function};
use crate::runner::ds::value::{JsObjectType, JsValue};
use crate::runner::logger::SharedLogger;
use crate::runner::patcher::patch::{ChildPatch, PatchCallback, PatchPhase, SharedPatch};

pub const PATCHER_LOG_SCOPE: &str = "Patcher";
pub const PROXY_NAME: &str = "BDPatcher";

/// Builds the proxy for `patch`.
///
/// Each phase re-reads the children list, so callbacks registered or removed
/// by an earlier phase are seen by later ones. A phase in progress always
/// runs the children it started with.
pub fn make_override(patch: &SharedPatch, logger: &SharedLogger) -> JsObjectType {
    let weak = Rc::downgrade(patch);
    let (original, name) = {
        let p = patch.borrow();
        (p.original_function.clone(), p.name.clone())
    };
    let logger = logger.clone();
    new_native_function(PROXY_NAME, move |this, args| {
        let patch = match weak.upgrade() {
            Some(p) => p,
            None => return call_function(&original, this, args),
        };
        let snapshot = |phase| patch.borrow().snapshot(phase);
        let report = |phase: PatchPhase, child: &ChildPatch, e: &JErrorType| {
            logger.err(
                PATCHER_LOG_SCOPE,
                &format!(
                    "Could not fire {} callback of {} for {}",
                    phase, name, child.caller
                ),
                Some(e),
            )
        };

        for child in snapshot(PatchPhase::Before) {
            if let PatchCallback::Before(cb) = &child.callback {
                if let Err(e) = cb(this, args) {
                    report(PatchPhase::Before, &child, &e);
                }
            }
        }

        let insteads = snapshot(PatchPhase::Instead);
        let mut return_value = if insteads.is_empty() {
            call_function(&original, this, args)?
        } else {
            let bound = JsValue::Object(bind_function(&original, this.clone()));
            let mut value = JsValue::Undefined;
            for child in insteads {
                if let PatchCallback::Instead(cb) = &child.callback {
                    match cb(this, args, &bound) {
                        Ok(v) if !v.is_undefined() => value = v,
                        Ok(_) => {}
                        Err(e) => report(PatchPhase::Instead, &child, &e),
                    }
                }
            }
            value
        };

        for child in snapshot(PatchPhase::After) {
            if let PatchCallback::After(cb) = &child.callback {
                match cb(this, args, &return_value) {
                    Ok(v) if !v.is_undefined() => return_value = v,
                    Ok(_) => {}
                    Err(e) => report(PatchPhase::After, &child, &e),
                }
            }
        }
        Ok(return_value)
    })
}
