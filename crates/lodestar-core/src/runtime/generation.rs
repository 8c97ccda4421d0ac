// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! One generation of runtime state
//!
//! Every table the runtime owns lives in a single [`Generation`]. A reset
//! builds a fresh generation and retires the old one; capability objects
//! keep a handle to the generation they were issued in and refuse to work
//! once it is retired.

use crate::config::DebugOptions;
use crate::error::{Error, Result};
use crate::loader::Loader;
use crate::module_system::{
    DependencyGraph, DependencyList, Factory, IdentifierResolver, LoadTracker, Locator, ModuleId,
    ModuleRegistry,
};
use crate::value::Exports;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A declaration made by a unit while its resource was being fetched,
/// waiting for the coordinator to register it
pub(crate) struct Declaration {
    pub(crate) dependencies: DependencyList,
    pub(crate) factory: Arc<dyn Factory>,
}

/// Lifecycle of the main unit within a generation
pub(crate) enum MainUnit {
    /// Nothing declared yet; the next top-level declare becomes main
    Absent,
    /// Registered, dependencies not yet provided
    Declared,
    /// Initialized
    Ready(Exports),
}

/// Mutable tables of a generation, guarded by one lock
pub(crate) struct State {
    pub(crate) registry: ModuleRegistry,
    pub(crate) graph: DependencyGraph,
    pub(crate) loads: LoadTracker,
    pub(crate) declarations: HashMap<ModuleId, Declaration>,
    pub(crate) main: MainUnit,
    pub(crate) debug: DebugOptions,
}

impl State {
    /// Register a pending unit and its dependency list together
    pub(crate) fn memoize(
        &mut self,
        id: ModuleId,
        dependencies: DependencyList,
        factory: Arc<dyn Factory>,
    ) -> Result<()> {
        if self.registry.is_known(&id) {
            return Err(Error::AlreadyProvided(id.display_name().to_string()));
        }
        self.graph.set_dependencies(id.clone(), dependencies)?;
        self.registry.memoize(id, factory)
    }
}

/// Runtime state for one process generation
pub struct Generation {
    number: u64,
    extension: String,
    loader: Arc<dyn Loader>,
    retired: AtomicBool,
    state: Mutex<State>,
    /// Signalled whenever a factory finishes, successfully or not
    settled: Condvar,
}

impl Generation {
    /// Create a generation rooted at `root_dir`
    pub(crate) fn new(
        number: u64,
        root_dir: String,
        extension: String,
        debug: DebugOptions,
        loader: Arc<dyn Loader>,
    ) -> Arc<Self> {
        Arc::new(Self {
            number,
            extension,
            loader,
            retired: AtomicBool::new(false),
            state: Mutex::new(State {
                registry: ModuleRegistry::new(),
                graph: DependencyGraph::new(IdentifierResolver::new(root_dir)),
                loads: LoadTracker::default(),
                declarations: HashMap::new(),
                main: MainUnit::Absent,
                debug,
            }),
            settled: Condvar::new(),
        })
    }

    /// Generation number, starting at 1
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Check if a reset replaced this generation
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Fail if this generation was retired
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_retired() {
            return Err(Error::StaleContext {
                generation: self.number,
            });
        }
        Ok(())
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// Lock the tables. Never held across a factory call or an `.await`.
    pub(crate) fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    /// Park until some factory running on another thread finishes
    pub(crate) fn wait_for_factory(&self, state: &mut MutexGuard<'_, State>) {
        self.settled.wait(state);
    }

    pub(crate) fn factory_settled(&self) {
        self.settled.notify_all();
    }

    pub(crate) fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    /// Locator for `id`
    pub fn locator(&self, id: &ModuleId) -> Locator {
        id.locator(&self.extension)
    }

    /// Application root of this generation
    pub fn root_dir(&self) -> String {
        self.state().graph.resolver().root_dir().to_string()
    }

    /// Every known id
    pub fn list_modules(&self) -> Vec<ModuleId> {
        self.state().registry.ids()
    }

    /// Current diagnostic switches
    pub fn debug_options(&self) -> DebugOptions {
        self.state().debug
    }

    /// Check whether any fetch is outstanding
    pub fn is_loading(&self) -> bool {
        !self.state().loads.is_idle()
    }
}
