//! Locating modules in the host's bundler registry.

pub mod filters;
pub mod polyfill;
pub mod registry;
pub mod resolver;
pub mod snapshot;
pub mod utilities;
