// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The declare capability handed to units

use crate::error::{Error, Result};
use crate::module_system::dependency::{DependencyEntry, DependencyList};
use crate::module_system::factory::Factory;
use crate::module_system::id::{ModuleId, Origin};
use crate::module_system::provision::ProvisionCoordinator;
use crate::module_system::require::Require;
use crate::runtime::{Declaration, Generation, MainUnit};
use crate::value::Exports;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A unit's view of itself: declaring, provisioning more dependencies,
/// and reaching the main unit.
#[derive(Clone)]
pub struct Module {
    generation: Arc<Generation>,
    origin: Origin,
}

impl Module {
    pub(crate) fn new(generation: Arc<Generation>, origin: Origin) -> Self {
        Self { generation, origin }
    }

    /// Context this view is bound to
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Bound unit's id; `None` for the ambient context
    pub fn id(&self) -> Option<&ModuleId> {
        self.origin.module_id()
    }

    /// Copy of the bound unit's declared dependencies
    pub fn dependencies(&self) -> Result<DependencyList> {
        self.generation.check()?;
        Ok(self.generation.state().graph.get_dependencies(&self.origin))
    }

    /// Declare this unit's dependencies and factory.
    ///
    /// From the ambient context this registers the main unit, if there is
    /// none yet. From a unit whose resource is being fetched it records the
    /// declaration for the fetch to register on completion. Anything else
    /// fails with `AlreadyProvided`.
    pub fn declare<F>(&self, dependencies: DependencyList, factory: F) -> Result<()>
    where
        F: Fn(&Require, &Exports, &Module) -> Result<Option<Exports>> + Send + Sync + 'static,
    {
        self.declare_factory(dependencies, Arc::new(factory))
    }

    /// [`Module::declare`] with an already type-erased factory
    pub fn declare_factory(
        &self,
        dependencies: DependencyList,
        factory: Arc<dyn Factory>,
    ) -> Result<()> {
        self.generation.check()?;
        let mut state = self.generation.state();

        match &self.origin {
            Origin::Ambient => {
                if !matches!(state.main, MainUnit::Absent) {
                    return Err(Error::AlreadyProvided(ModuleId::main().display_name().to_string()));
                }
                state.memoize(ModuleId::main(), dependencies, factory)?;
                state.main = MainUnit::Declared;
                debug!("main unit declared");
                Ok(())
            }
            Origin::Module(id) => {
                let loading = state.loads.is_loading(&self.generation.locator(id));
                if !loading || state.registry.is_known(id) || state.declarations.contains_key(id) {
                    return Err(Error::AlreadyProvided(id.display_name().to_string()));
                }
                state.declarations.insert(
                    id.clone(),
                    Declaration {
                        dependencies,
                        factory,
                    },
                );
                Ok(())
            }
        }
    }

    /// Provide `dependencies`, resolved relative to this unit
    pub async fn provide(&self, dependencies: DependencyList) -> Result<()> {
        ProvisionCoordinator::new(Arc::clone(&self.generation))
            .provide(&self.origin, &dependencies)
            .await
    }

    /// Provide the single unit `identifier` names
    pub async fn load(&self, identifier: &str) -> Result<()> {
        self.provide(vec![DependencyEntry::plain(identifier)]).await
    }

    /// Main unit's exports, once it has initialized
    pub fn main(&self) -> Result<Option<Exports>> {
        self.generation.check()?;
        match &self.generation.state().main {
            MainUnit::Ready(exports) => Ok(Some(exports.clone())),
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("origin", &self.origin)
            .field("generation", &self.generation.number())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Module;
    use crate::config::RuntimeConfig;
    use crate::error::Error;
    use crate::loader::MemoryLoader;
    use crate::module_system::{DependencyEntry, Origin, parse_id};
    use crate::runtime::Runtime;
    use std::sync::Arc;

    #[test]
    fn test_ambient_declare_registers_main_once() {
        let runtime = Runtime::new(RuntimeConfig::default(), Arc::new(MemoryLoader::new()));
        let module = runtime.module();

        module
            .declare(vec![DependencyEntry::plain("dep")], |_, _, _| Ok(None))
            .unwrap();
        assert!(runtime.require().is_memoized("").unwrap());
        assert!(matches!(
            module.declare(Vec::new(), |_, _, _| Ok(None)),
            Err(Error::AlreadyProvided(name)) if name == "<main>"
        ));
    }

    #[test]
    fn test_declare_outside_fetch_fails() {
        let runtime = Runtime::new(RuntimeConfig::default(), Arc::new(MemoryLoader::new()));
        runtime
            .require()
            .memoize("a", Vec::new(), |_, _, module| {
                module.declare(Vec::new(), |_, _, _| Ok(None))?;
                Ok(None)
            })
            .unwrap();

        assert!(matches!(
            runtime.require().require("a"),
            Err(Error::AlreadyProvided(id)) if id == "a"
        ));
    }

    #[tokio::test]
    async fn test_load_from_nested_unit() {
        let loader = Arc::new(MemoryLoader::new());
        loader.insert_unit("lib/extra.js", Vec::new(), |_, _, _| Ok(None));
        let runtime = Runtime::new(RuntimeConfig::default(), loader.clone());
        runtime
            .require()
            .memoize("lib/core", Vec::new(), |_, _, _| Ok(None))
            .unwrap();

        let module = Module::new(
            runtime.generation(),
            Origin::Module(parse_id("lib/core").unwrap()),
        );
        module.load("./extra").await.unwrap();

        assert!(runtime.require().is_memoized("lib/extra").unwrap());
        assert_eq!(loader.fetch_count("lib/extra.js"), 1);
    }

    #[test]
    fn test_dependencies_is_a_copy() {
        let runtime = Runtime::new(RuntimeConfig::default(), Arc::new(MemoryLoader::new()));
        runtime
            .require()
            .memoize("a", vec![DependencyEntry::plain("b")], |_, _, module| {
                let mut deps = module.dependencies()?;
                deps.clear();
                assert_eq!(module.dependencies()?.len(), 1);
                assert_eq!(module.id().map(|id| id.as_str()), Some("a"));
                Ok(None)
            })
            .unwrap();

        runtime.require().require("a").unwrap();
    }
}
