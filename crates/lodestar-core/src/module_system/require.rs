// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The require capability handed to unit factories

use crate::error::{Error, Result};
use crate::module_system::dependency::DependencyList;
use crate::module_system::factory::Factory;
use crate::module_system::id::{Locator, ModuleId, Origin};
use crate::module_system::initializer;
use crate::module_system::module::Module;
use crate::module_system::registry::ModuleState;
use crate::module_system::resolver::parse_id;
use crate::runtime::Generation;
use crate::value::Exports;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Synchronous require, bound to the unit (or ambient context) it was
/// issued for. Identifiers resolve against that unit's directory and
/// labels.
#[derive(Clone)]
pub struct Require {
    generation: Arc<Generation>,
    origin: Origin,
}

impl Require {
    pub(crate) fn new(generation: Arc<Generation>, origin: Origin) -> Self {
        Self { generation, origin }
    }

    /// Context this view is bound to
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Generation this view was issued in
    pub fn generation(&self) -> u64 {
        self.generation.number()
    }

    /// Name for diagnostics: `require <ambient>`, `require <main>`, `require <"a/b">`
    pub fn display_name(&self) -> String {
        format!("require {}", self.origin)
    }

    /// Resolve `identifier` and return the unit's exports, running its
    /// factory first if it is still pending.
    pub fn require(&self, identifier: &str) -> Result<Exports> {
        self.generation.check()?;

        let (id, state, warn_undeclared) = {
            let state = self.generation.state();
            let id = state.graph.resolve(identifier, &self.origin)?;
            let module_state = state.registry.state(&id);
            (id, module_state, state.debug.warn_undeclared)
        };

        if state == ModuleState::Unknown {
            return Err(Error::not_available(id.display_name()));
        }

        let exports = initializer::initialize(&self.generation, &id)?;

        if warn_undeclared && !self.origin.is_ambient() {
            self.warn_if_undeclared(&id);
        }

        Ok(exports)
    }

    fn warn_if_undeclared(&self, id: &ModuleId) {
        let declared = self.generation.state().graph.declares(&self.origin, id);
        if let Ok(false) = declared {
            warn!(
                id = %id.display_name(),
                requester = %self.origin,
                "The module with ID \"{}\" was not specified in the dependency array for the {} module.",
                id.display_name(),
                self.origin
            );
        }
    }

    /// Canonical id `identifier` resolves to from here
    pub fn id(&self, identifier: &str) -> Result<ModuleId> {
        self.generation.check()?;
        self.generation.state().graph.resolve(identifier, &self.origin)
    }

    /// Resource locator `identifier` resolves to from here
    pub fn uri(&self, identifier: &str) -> Result<Locator> {
        let id = self.id(identifier)?;
        Ok(self.generation.locator(&id))
    }

    /// Register a unit synchronously under `id`. Fails with
    /// `AlreadyProvided` if `id` is pending or initialized.
    pub fn memoize<F>(&self, id: &str, dependencies: DependencyList, factory: F) -> Result<()>
    where
        F: Fn(&Require, &Exports, &Module) -> Result<Option<Exports>> + Send + Sync + 'static,
    {
        self.memoize_factory(id, dependencies, Arc::new(factory))
    }

    /// [`Require::memoize`] with an already type-erased factory
    pub fn memoize_factory(
        &self,
        id: &str,
        dependencies: DependencyList,
        factory: Arc<dyn Factory>,
    ) -> Result<()> {
        self.generation.check()?;
        let id = parse_id(id)?;
        self.generation.state().memoize(id, dependencies, factory)
    }

    /// Check if `id` is pending or initialized. Never mutates anything.
    pub fn is_memoized(&self, id: &str) -> Result<bool> {
        self.generation.check()?;
        let id = parse_id(id)?;
        Ok(self.generation.state().registry.is_known(&id))
    }
}

impl fmt::Debug for Require {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Require")
            .field("origin", &self.origin)
            .field("generation", &self.generation.number())
            .finish()
    }
}
