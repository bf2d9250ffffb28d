//! Function interception: one aggregating proxy per patched slot, with
//! independently removable `before`, `instead` and `after` callbacks.

pub mod bound;
pub mod dispatch;
pub mod engine;
pub mod monkey_patch;
pub mod patch;
pub mod target;

pub use bound::BoundPatcher;
pub use engine::{PatchOptions, Patcher, UnpatchTarget};
pub use patch::{ChildPatch, PatchCallback, PatchPhase, Unpatch};
pub use target::PatchTarget;
