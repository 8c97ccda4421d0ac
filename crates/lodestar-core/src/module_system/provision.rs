// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Asynchronous provisioning
//!
//! Provisioning makes a set of ids known (pending or initialized) before
//! anyone requires them. Each id is handled independently:
//!
//! - a known id is done, although a pending one first has its own
//!   dependencies provided;
//! - an unknown id whose locator is already being fetched waits on that
//!   fetch instead of starting another;
//! - any other unknown id is fetched through the [`Loader`], and the unit's
//!   declaration is registered once the fetch completes.
//!
//! A batch resolves once every requested id has settled. A failed fetch
//! settles too; the id just stays unknown.
//!
//! [`Loader`]: crate::loader::Loader

use crate::error::{Error, Result};
use crate::loader::LoadRequest;
use crate::module_system::dependency::DependencyEntry;
use crate::module_system::id::{Locator, ModuleId, Origin};
use crate::module_system::module::Module;
use crate::runtime::Generation;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// Outstanding fetches, keyed by locator, with the waiters queued on each
#[derive(Debug, Default)]
pub struct LoadTracker {
    outstanding: HashMap<Locator, Vec<oneshot::Sender<()>>>,
}

impl LoadTracker {
    /// Check if `locator` is being fetched
    pub fn is_loading(&self, locator: &Locator) -> bool {
        self.outstanding.contains_key(locator)
    }

    /// Check if nothing is being fetched
    pub fn is_idle(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Number of outstanding fetches
    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    /// Check if nothing is being fetched
    pub fn is_empty(&self) -> bool {
        self.is_idle()
    }

    /// Mark `locator` as being fetched
    pub(crate) fn start(&mut self, locator: Locator) {
        self.outstanding.entry(locator).or_default();
    }

    /// Queue a waiter on an outstanding fetch. `None` if there is none.
    pub(crate) fn listen(&mut self, locator: &Locator) -> Option<oneshot::Receiver<()>> {
        let waiters = self.outstanding.get_mut(locator)?;
        let (tx, rx) = oneshot::channel();
        waiters.push(tx);
        Some(rx)
    }

    /// End a fetch, handing back its waiters
    pub(crate) fn finish(&mut self, locator: &Locator) -> Vec<oneshot::Sender<()>> {
        self.outstanding.remove(locator).unwrap_or_default()
    }

    /// Drop every fetch record. Dropped senders wake their waiters.
    pub fn clear(&mut self) {
        self.outstanding.clear();
    }
}

/// Pending ids whose dependencies a batch already took care of
type Visited = Arc<Mutex<HashSet<ModuleId>>>;

/// What to do for one requested id
enum Step {
    Known,
    Wait(oneshot::Receiver<()>),
    Fetch(Locator),
}

/// Drives fetches for one generation
#[derive(Clone)]
pub struct ProvisionCoordinator {
    generation: Arc<Generation>,
}

impl ProvisionCoordinator {
    /// Create a coordinator for `generation`
    pub(crate) fn new(generation: Arc<Generation>) -> Self {
        Self { generation }
    }

    /// Provide `dependencies`, resolved relative to `origin`.
    ///
    /// Resolution errors fail the call before anything is fetched. Fetch
    /// failures only log; the affected ids stay unknown.
    pub async fn provide(&self, origin: &Origin, dependencies: &[DependencyEntry]) -> Result<()> {
        self.generation.check()?;
        if dependencies.is_empty() {
            return Ok(());
        }

        let ids = self
            .generation
            .state()
            .graph
            .expand_to_canonical_ids(dependencies, origin)?;

        debug!(requester = %origin, count = ids.len(), "providing");
        self.provide_ids(ids, Visited::default()).await;
        Ok(())
    }

    /// Make the main unit's dependencies known
    pub(crate) async fn provide_main(&self) -> Result<()> {
        self.generation.check()?;
        let main = ModuleId::main();
        if !self.generation.state().registry.is_known(&main) {
            return Err(Error::not_available(main.display_name()));
        }
        self.provide_ids(vec![main], Visited::default()).await;
        Ok(())
    }

    fn provide_ids(&self, ids: Vec<ModuleId>, visited: Visited) -> BoxFuture<'static, ()> {
        let coordinator = self.clone();
        async move {
            let mut seen = HashSet::new();
            let pending = ids
                .into_iter()
                .filter(|id| seen.insert(id.clone()))
                .map(|id| coordinator.ensure_known(id, Arc::clone(&visited)));
            join_all(pending).await;
        }
        .boxed()
    }

    fn ensure_known(&self, id: ModuleId, visited: Visited) -> BoxFuture<'static, ()> {
        let coordinator = self.clone();
        async move {
            let step = {
                let mut state = coordinator.generation.state();
                let locator = coordinator.generation.locator(&id);
                if state.registry.is_known(&id) {
                    Step::Known
                } else if let Some(waiter) = state.loads.listen(&locator) {
                    Step::Wait(waiter)
                } else {
                    state.loads.start(locator.clone());
                    Step::Fetch(locator)
                }
            };

            match step {
                Step::Known => {}
                Step::Wait(waiter) => {
                    trace!(id = %id.display_name(), "waiting on outstanding fetch");
                    let _ = waiter.await;
                }
                Step::Fetch(locator) => coordinator.fetch(&id, locator).await,
            }

            coordinator.provide_dependencies_of(id, visited).await;
        }
        .boxed()
    }

    /// Provide a pending unit's own dependencies, once per batch
    async fn provide_dependencies_of(&self, id: ModuleId, visited: Visited) {
        let dependencies = {
            let state = self.generation.state();
            if !state.registry.is_pending(&id) || !visited.lock().insert(id.clone()) {
                return;
            }
            let origin = Origin::Module(id.clone());
            state
                .graph
                .expand_to_canonical_ids(state.graph.dependencies(&origin), &origin)
        };

        match dependencies {
            Ok(ids) if ids.is_empty() => {}
            Ok(ids) => self.provide_ids(ids, visited).await,
            Err(e) => warn!(id = %id.display_name(), error = %e, "unresolvable dependencies"),
        }
    }

    /// Fetch one unit and register whatever it declared
    async fn fetch(&self, id: &ModuleId, locator: Locator) {
        let (disable_caching, module) = {
            let state = self.generation.state();
            (
                state.debug.disable_caching,
                Module::new(Arc::clone(&self.generation), Origin::Module(id.clone())),
            )
        };
        let request = LoadRequest::new(locator.clone(), disable_caching);

        debug!(id = %id.display_name(), href = %request.href, "fetching");
        let outcome = self.generation.loader().load(request, module).await;

        let waiters = {
            let mut state = self.generation.state();
            let declaration = state.declarations.remove(id);

            match (outcome, declaration) {
                (Err(e), _) => {
                    warn!(id = %id.display_name(), locator = %locator, error = %e, "fetch failed");
                }
                (Ok(()), None) => {
                    let violation = Error::LoaderContractViolation(id.display_name().to_string());
                    warn!(id = %id.display_name(), locator = %locator, "{}", violation);
                }
                (Ok(()), Some(declaration)) => {
                    match state.memoize(id.clone(), declaration.dependencies, declaration.factory) {
                        Ok(()) => debug!(id = %id.display_name(), "registered"),
                        Err(e) => {
                            warn!(id = %id.display_name(), error = %e, "discarding declaration")
                        }
                    }
                }
            }

            state.loads.finish(&locator)
        };

        for waiter in waiters {
            let _ = waiter.send(());
        }
    }
}
