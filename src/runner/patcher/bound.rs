use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::{JsObjectType, JsValue};
use crate::runner::patcher::engine::{PatchOptions, SharedPatcher};
use crate::runner::patcher::monkey_patch::MonkeyPatchOptions;
use crate::runner::patcher::patch::{ChildPatch, PatchCallback, Unpatch};
use crate::runner::patcher::target::PatchTarget;

/// A patcher view that registers everything under one caller label. Each
/// plugin gets its own, so stopping the plugin is a single `unpatch_all`.
#[derive(Clone)]
pub struct BoundPatcher {
    label: String,
    patcher: SharedPatcher,
}

impl BoundPatcher {
    pub fn new(label: impl Into<String>, patcher: SharedPatcher) -> Self {
        BoundPatcher {
            label: label.into(),
            patcher,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn before<F>(&self, target: impl Into<PatchTarget>, method: &str, callback: F) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>) -> Result<(), JErrorType> + 'static,
    {
        self.patcher.before(&self.label, target, method, callback)
    }

    pub fn instead<F>(&self, target: impl Into<PatchTarget>, method: &str, callback: F) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        self.patcher.instead(&self.label, target, method, callback)
    }

    pub fn after<F>(&self, target: impl Into<PatchTarget>, method: &str, callback: F) -> Option<Unpatch>
    where
        F: Fn(&JsValue, &mut Vec<JsValue>, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        self.patcher.after(&self.label, target, method, callback)
    }

    pub fn patch_with(
        &self,
        target: impl Into<PatchTarget>,
        method: &str,
        callback: PatchCallback,
        options: &PatchOptions,
    ) -> Option<Unpatch> {
        self.patcher
            .push_child_patch(&self.label, &target.into(), method, callback, options)
    }

    /// [`Patcher::monkey_patch`](crate::runner::patcher::engine::Patcher::monkey_patch)
    /// with this view's label as the caller id.
    pub fn monkey_patch(
        &self,
        what: &JsObjectType,
        method: &str,
        options: MonkeyPatchOptions,
    ) -> Option<Unpatch> {
        self.patcher
            .monkey_patch(what, method, options.caller_id(self.label.clone()))
    }

    pub fn get_patches(&self) -> Vec<ChildPatch> {
        self.patcher.get_patches_by_caller(&self.label)
    }

    pub fn unpatch_all(&self) {
        self.patcher.unpatch_all(self.label.as_str());
    }
}
