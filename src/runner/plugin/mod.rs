//! The plugin-facing surface.
//!
//! Plugins never touch the resolver or the patcher directly. They receive a
//! [`PluginApi`] from the [`CompatRuntime`]:
//!
//! ```text
//! CompatRuntime
//! ├── ModuleRegistry   live modules, appended as the host loads code
//! ├── ModuleResolver   guarded scans over the registry
//! ├── Patcher          one proxy per patched slot
//! │   └── KnownModules name-based patch targets
//! └── PluginApi (per plugin)
//!     ├── BoundPatcher patches owned by the plugin's label
//!     └── webpack      shared resolver
//! ```
//!
//! ## Example
//!
//! ```
//! use bdshim::runner::ds::builder::ObjectBuilder;
//! use bdshim::runner::ds::value::JsValue;
//! use bdshim::runner::plugin::{CompatRuntime, KnownModules};
//! use bdshim::runner::webpack::registry::ModuleRegistry;
//!
//! let registry = ModuleRegistry::shared();
//! let dispatcher = ObjectBuilder::new()
//!     .add_method("dispatch", |_this, _args| Ok(JsValue::Undefined))
//!     .build_value();
//! registry.register(1u64, dispatcher.clone());
//!
//! let runtime = CompatRuntime::with_registry(registry);
//! runtime.setup(KnownModules::new().with("Dispatcher", dispatcher));
//!
//! let api = runtime.api(Some("MyPlugin"));
//! api.patcher.before("Dispatcher", "dispatch", |_this, _args| Ok(()));
//! assert_eq!(api.patcher.get_patches().len(), 1);
//!
//! runtime.stop_plugin("MyPlugin");
//! assert!(api.patcher.get_patches().is_empty());
//! ```

pub mod api;
pub mod config;
pub mod registry;

pub use api::{CompatRuntime, PluginApi};
pub use config::ShimConfig;
pub use registry::KnownModules;
