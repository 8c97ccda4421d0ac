// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Core runtime implementation

mod debug;
mod generation;

pub use debug::{DEBUG_MODULE_ID, Debug};
pub use generation::Generation;
pub(crate) use generation::{Declaration, MainUnit};

use crate::config::{DebugOptionsUpdate, RuntimeConfig};
use crate::error::Result;
use crate::loader::Loader;
use crate::module_system::{MAIN_MODULE_ID, Module, ModuleId, Origin, ProvisionCoordinator, Require};
use crate::value::Exports;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Shared core behind [`Runtime`] and [`Debug`] handles
pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    loader: Arc<dyn Loader>,
    generations: AtomicU64,
    current: RwLock<Arc<Generation>>,
}

impl RuntimeInner {
    /// Build a generation rooted at `root_dir`, with the debug unit installed
    fn spawn_generation(self: &Arc<Self>, root_dir: String) -> Arc<Generation> {
        let number = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Generation::new(
            number,
            root_dir,
            self.config.extension.clone(),
            self.config.debug,
            Arc::clone(&self.loader),
        );
        debug::install(&generation, Arc::downgrade(self));
        generation
    }

    pub(crate) fn generation(&self) -> Arc<Generation> {
        self.current.read().clone()
    }

    /// Replace the current generation with a fresh one
    pub(crate) fn reset(self: &Arc<Self>, root_dir: Option<&str>) {
        let root_dir = root_dir
            .map(str::to_string)
            .unwrap_or_else(|| self.config.root_dir.clone());

        let fresh = self.spawn_generation(root_dir);
        let number = fresh.number();
        let retired = std::mem::replace(&mut *self.current.write(), fresh);
        if retired.is_loading() {
            warn!(
                generation = retired.number(),
                "reset while fetches are outstanding; they will finish against the retired generation"
            );
        }
        retired.retire();
        info!(generation = number, "runtime reset");
    }

    pub(crate) fn set_debug_options(&self, update: DebugOptionsUpdate) {
        self.generation().state().debug.apply(update);
    }
}

/// A module runtime.
///
/// Owns the current [`Generation`] and hands out capability views bound to
/// it. Cloning shares the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime fetching units through `loader`
    pub fn new(config: RuntimeConfig, loader: Arc<dyn Loader>) -> Self {
        let root_dir = config.root_dir.clone();
        let inner = Arc::new_cyclic(|weak| {
            let first = Generation::new(
                1,
                root_dir,
                config.extension.clone(),
                config.debug,
                Arc::clone(&loader),
            );
            debug::install(&first, weak.clone());
            RuntimeInner {
                config,
                loader,
                generations: AtomicU64::new(1),
                current: RwLock::new(first),
            }
        });

        debug!(root_dir = %inner.config.root_dir, extension = %inner.config.extension, "runtime created");
        Self { inner }
    }

    /// Configuration the runtime was created with
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Current generation
    pub fn generation(&self) -> Arc<Generation> {
        self.inner.generation()
    }

    /// Ambient require view of the current generation
    pub fn require(&self) -> Require {
        Require::new(self.generation(), Origin::Ambient)
    }

    /// Ambient module view of the current generation
    pub fn module(&self) -> Module {
        Module::new(self.generation(), Origin::Ambient)
    }

    /// Require view bound to the main unit
    pub fn main_require(&self) -> Require {
        Require::new(self.generation(), Origin::Module(ModuleId::main()))
    }

    /// Debug handle for this runtime
    pub fn debug(&self) -> Debug {
        Debug::new(Arc::downgrade(&self.inner))
    }

    /// Provide the main unit's dependencies, then initialize it.
    ///
    /// Fails with `NotAvailable` if no main unit was declared.
    pub async fn run_main(&self) -> Result<Exports> {
        let generation = self.generation();
        ProvisionCoordinator::new(Arc::clone(&generation))
            .provide_main()
            .await?;

        let exports = Require::new(Arc::clone(&generation), Origin::Ambient).require(MAIN_MODULE_ID)?;
        generation.state().main = MainUnit::Ready(exports.clone());
        info!("main unit initialized");
        Ok(exports)
    }

    /// Drop every unit and start a fresh generation, optionally with a new
    /// application root. Views issued before the reset stop working.
    pub fn reset(&self, root_dir: Option<&str>) {
        self.inner.reset(root_dir);
    }

    /// Every known id of the current generation
    pub fn list_modules(&self) -> Vec<ModuleId> {
        self.generation().list_modules()
    }

    /// Change diagnostic switches until the next reset
    pub fn set_debug_options(&self, update: DebugOptionsUpdate) {
        self.inner.set_debug_options(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::loader::MemoryLoader;
    use crate::module_system::DependencyEntry;

    fn runtime() -> (Runtime, Arc<MemoryLoader>) {
        let loader = Arc::new(MemoryLoader::new());
        (Runtime::new(RuntimeConfig::default(), loader.clone()), loader)
    }

    #[test]
    fn test_fresh_runtime_knows_debug_unit() {
        let (runtime, _) = runtime();
        let ids: Vec<_> = runtime.list_modules().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec![DEBUG_MODULE_ID]);
        assert_eq!(runtime.generation().number(), 1);
    }

    #[tokio::test]
    async fn test_run_main() {
        let (runtime, loader) = runtime();
        loader.insert_unit("dep.js", Vec::new(), |_, exports, _| {
            exports.set("value", 42);
            Ok(None)
        });

        runtime
            .module()
            .declare(vec![DependencyEntry::plain("./dep")], |require, exports, _| {
                exports.set("dep", require.require("./dep")?);
                Ok(None)
            })
            .unwrap();

        let main = runtime.run_main().await.unwrap();
        assert!(main.contains("dep"));
        assert!(runtime.module().main().unwrap().unwrap().ptr_eq(&main));
    }

    #[tokio::test]
    async fn test_run_main_without_main() {
        let (runtime, _) = runtime();
        assert!(matches!(runtime.run_main().await, Err(Error::NotAvailable(_))));
    }

    #[test]
    fn test_reset_invalidates_views() {
        let (runtime, _) = runtime();
        let stale = runtime.require();
        stale.memoize("a", Vec::new(), |_, _, _| Ok(None)).unwrap();

        runtime.reset(Some("app"));

        assert!(matches!(
            stale.require("a"),
            Err(Error::StaleContext { generation: 1 })
        ));
        assert_eq!(runtime.generation().number(), 2);
        assert_eq!(runtime.generation().root_dir(), "app");
        assert!(!runtime.require().is_memoized("a").unwrap());
    }

    #[test]
    fn test_reset_restores_debug_defaults() {
        let (runtime, _) = runtime();
        runtime.set_debug_options(DebugOptionsUpdate {
            disable_caching: Some(true),
            warn_undeclared: None,
        });
        assert!(runtime.generation().debug_options().disable_caching);

        runtime.reset(None);
        assert!(!runtime.generation().debug_options().disable_caching);
    }
}
