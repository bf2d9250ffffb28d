//! # bdshim - plugin compatibility shim in Rust
//!
//! The interception core of a client-mod compatibility layer:
//! - A dynamic object model standing in for the host's JavaScript heap
//! - A module resolver that scans a live bundler registry with predicates
//! - A patch engine composing `before` / `instead` / `after` callbacks from
//!   independent callers on one proxy per patched method
//! - A plugin-facing runtime that binds patches to plugin labels
//!
//! ## Quick Start
//!
//! ### Finding a module
//!
//! ```
//! use bdshim::runner::ds::builder::ObjectBuilder;
//! use bdshim::runner::ds::value::JsValue;
//! use bdshim::runner::logger::TracingLogger;
//! use bdshim::runner::webpack::registry::ModuleRegistry;
//! use bdshim::runner::webpack::resolver::ModuleResolver;
//! use std::rc::Rc;
//!
//! let registry = ModuleRegistry::shared();
//! registry.register(
//!     7u64,
//!     ObjectBuilder::new()
//!         .add_method("getCurrentUser", |_this, _args| Ok(JsValue::Null))
//!         .add_method("getUser", |_this, _args| Ok(JsValue::Null))
//!         .build_value(),
//! );
//!
//! let resolver = ModuleResolver::new(registry, Rc::new(TracingLogger));
//! assert!(resolver.get_by_keys(&["getCurrentUser", "getUser"]).is_some());
//! assert!(resolver.get_by_keys(&["getToken"]).is_none());
//! ```
//!
//! ### Patching a method
//!
//! ```
//! use bdshim::runner::ds::builder::ObjectBuilder;
//! use bdshim::runner::ds::function_object::call;
//! use bdshim::runner::ds::operations::object::get;
//! use bdshim::runner::ds::value::JsValue;
//! use bdshim::runner::logger::TracingLogger;
//! use bdshim::runner::patcher::Patcher;
//! use std::rc::Rc;
//!
//! let target = ObjectBuilder::new()
//!     .add_method("greet", |_this, args| Ok(JsValue::from(format!("Hi {}", args[0]))))
//!     .build();
//! let patcher = Patcher::new(Rc::new(TracingLogger));
//!
//! patcher.before("Shouter", &target, "greet", |_this, args| {
//!     args[0] = JsValue::from(args[0].to_string().to_uppercase());
//!     Ok(())
//! });
//!
//! let greet = get(&target, "greet").unwrap();
//! let this = JsValue::Object(target.clone());
//! let out = call(&greet, &this, &mut vec![JsValue::from("bob")]).unwrap();
//! assert_eq!(out, JsValue::from("Hi BOB"));
//!
//! patcher.unpatch_all("Shouter");
//! ```
//!
//! ## Architecture
//!
//! - **[`runner::ds`]** - Data structures (values, objects, function objects)
//! - **[`runner::webpack`]** - Module registry, filters and the resolver
//! - **[`runner::patcher`]** - Patch records, the dispatch proxy and the engine
//! - **[`runner::plugin`]** - Known modules, configuration and the runtime facade
//! - **[`runner::logger`]** - Diagnostics sink shared by all of the above

#[macro_use]
extern crate lazy_static;

pub mod runner;
