// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lazy, cycle-safe unit initialization
//!
//! A pending unit's factory runs the first time anyone requires it. Before
//! the factory runs, its exports container is attached to the pending
//! record; a require that re-enters the same unit while the factory is
//! still on the stack (a dependency cycle) receives that container as-is
//! instead of running the factory again. Units in a cycle therefore see
//! each other's partially populated exports, and every holder of the
//! reference observes the final state once the factories return.

use crate::error::Result;
use crate::module_system::id::{ModuleId, Origin};
use crate::module_system::module::Module;
use crate::module_system::registry::Initialization;
use crate::module_system::require::Require;
use crate::runtime::Generation;
use crate::value::Exports;
use std::sync::Arc;
use tracing::{debug, trace};

/// Initialize `id` if needed and return its exports.
///
/// Fails with `NotAvailable` for an id without a record, and with
/// `CircularExportsConflict` when a unit whose container was already handed
/// to a cyclic dependent returns different exports.
pub(crate) fn initialize(generation: &Arc<Generation>, id: &ModuleId) -> Result<Exports> {
    let (factory, exports) = {
        let mut state = generation.state();
        loop {
            match state.registry.begin_initialization(id)? {
                Initialization::Ready(exports) => return Ok(exports),
                Initialization::Reentrant(exports) => {
                    debug!(id = %id.display_name(), "circular require, using exports in progress");
                    return Ok(exports);
                }
                Initialization::Busy => {
                    trace!(id = %id.display_name(), "waiting on another thread's factory");
                    generation.wait_for_factory(&mut state);
                }
                Initialization::Run { factory, exports } => break (factory, exports),
            }
        }
    };

    trace!(id = %id.display_name(), "running factory");
    let origin = Origin::Module(id.clone());
    let require = Require::new(Arc::clone(generation), origin.clone());
    let module = Module::new(Arc::clone(generation), origin);

    let published = factory.call(&require, &exports, &module).and_then(|result| {
        generation
            .state()
            .registry
            .complete_initialization(id, result)
    });
    if published.is_err() {
        generation.state().registry.abandon_initialization(id);
    }
    generation.factory_settled();

    let published = published?;
    debug!(id = %id.display_name(), "initialized");
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::error::Error;
    use crate::loader::MemoryLoader;
    use crate::module_system::resolver::parse_id;
    use crate::runtime::Runtime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::default(), Arc::new(MemoryLoader::new()))
    }

    #[test]
    fn test_factory_runs_once() {
        let runtime = runtime();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        runtime
            .require()
            .memoize("counted", Vec::new(), move |_, exports, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                exports.set("ready", true);
                Ok(None)
            })
            .unwrap();

        let generation = runtime.generation();
        let id = parse_id("counted").unwrap();
        let first = initialize(&generation, &id).unwrap();
        let second = initialize(&generation, &id).unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_id() {
        let runtime = runtime();
        let generation = runtime.generation();
        assert!(matches!(
            initialize(&generation, &parse_id("missing").unwrap()),
            Err(Error::NotAvailable(_))
        ));
    }

    #[test]
    fn test_failed_factory_keeps_container() {
        let runtime = runtime();
        runtime
            .require()
            .memoize("broken", Vec::new(), |_, exports, _| {
                exports.set("partial", 1);
                Err(Error::factory("boom"))
            })
            .unwrap();

        let generation = runtime.generation();
        let id = parse_id("broken").unwrap();
        assert!(matches!(initialize(&generation, &id), Err(Error::Factory(_))));

        let partial = initialize(&generation, &id).unwrap();
        assert!(partial.contains("partial"));
    }
}
