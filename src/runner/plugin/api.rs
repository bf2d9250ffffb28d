//! The runtime facade handed to plugins.
//!
//! A [`CompatRuntime`] wires the module registry, the resolver and the
//! patcher to one logger and one configuration. Each plugin receives a
//! [`PluginApi`] whose patcher is bound to the plugin's label, so
//! [`CompatRuntime::stop_plugin`] can undo everything the plugin did.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexSet;
use uuid::Uuid;

use crate::runner::ds::error::ShimError;
use crate::runner::logger::{SharedLogger, TracingLogger};
use crate::runner::patcher::bound::BoundPatcher;
use crate::runner::patcher::engine::{Patcher, SharedPatcher};
use crate::runner::plugin::config::ShimConfig;
use crate::runner::plugin::registry::KnownModules;
use crate::runner::webpack::registry::SharedRegistry;
use crate::runner::webpack::resolver::{ModuleResolver, SharedResolver};

const RUNTIME_LOG_SCOPE: &str = "BdApi";

/// What one plugin sees.
#[derive(Clone)]
pub struct PluginApi {
    label: String,
    pub patcher: BoundPatcher,
    pub webpack: SharedResolver,
}

impl PluginApi {
    pub fn label(&self) -> &str {
        &self.label
    }
}

pub struct CompatRuntime {
    config: ShimConfig,
    logger: SharedLogger,
    registry: SharedRegistry,
    resolver: SharedResolver,
    patcher: SharedPatcher,
    labels: RefCell<IndexSet<String>>,
}

impl CompatRuntime {
    pub fn new(registry: SharedRegistry, logger: SharedLogger, config: ShimConfig) -> Self {
        let resolver = Rc::new(ModuleResolver::with_defaults(
            registry.clone(),
            logger.clone(),
            config.resolver,
        ));
        let patcher = Rc::new(
            Patcher::new(logger.clone())
                .with_resolver(resolver.clone())
                .with_force_patch(config.patcher.force_patch),
        );
        CompatRuntime {
            config,
            logger,
            registry,
            resolver,
            patcher,
            labels: RefCell::new(IndexSet::new()),
        }
    }

    /// Default configuration, logging through `tracing`.
    pub fn with_registry(registry: SharedRegistry) -> Self {
        Self::new(registry, Rc::new(TracingLogger), ShimConfig::default())
    }

    pub fn from_config_file(
        registry: SharedRegistry,
        logger: SharedLogger,
        path: &Path,
    ) -> Result<Self, ShimError> {
        Ok(Self::new(registry, logger, ShimConfig::load(path)?))
    }

    /// Installs the known-module table.
    pub fn setup(&self, known: KnownModules) {
        self.logger.debug(
            RUNTIME_LOG_SCOPE,
            &format!("Known modules: {} entries", known.len()),
        );
        self.patcher.setup(known);
    }

    /// The API for `label`. Without a label the API gets a random one, so
    /// its patches still belong to a single owner.
    pub fn api(&self, label: Option<&str>) -> PluginApi {
        let label = match label {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => Uuid::new_v4().to_hyphenated().to_string(),
        };
        self.labels.borrow_mut().insert(label.clone());
        PluginApi {
            patcher: BoundPatcher::new(label.clone(), self.patcher.clone()),
            webpack: self.resolver.clone(),
            label,
        }
    }

    /// Removes every patch registered under `label`.
    pub fn stop_plugin(&self, label: &str) {
        let count = self.patcher.get_patches_by_caller(label).len();
        self.patcher.unpatch_all(label);
        self.labels.borrow_mut().shift_remove(label);
        self.logger.debug(
            RUNTIME_LOG_SCOPE,
            &format!("Stopped {} ({} patches removed)", label, count),
        );
    }

    /// Labels of the APIs handed out and not stopped since.
    pub fn labels(&self) -> Vec<String> {
        self.labels.borrow().iter().cloned().collect()
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    pub fn logger(&self) -> &SharedLogger {
        &self.logger
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &SharedResolver {
        &self.resolver
    }

    pub fn patcher(&self) -> &SharedPatcher {
        &self.patcher
    }
}
