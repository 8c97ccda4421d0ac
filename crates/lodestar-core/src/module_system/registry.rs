// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module lifecycle records

use crate::error::{Error, Result};
use crate::module_system::factory::Factory;
use crate::module_system::id::ModuleId;
use crate::value::Exports;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Observable lifecycle state of an id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// No record
    Unknown,
    /// Registered, factory not yet run
    Pending,
    /// Factory running (or failed part way)
    Initializing,
    /// Exports final
    Initialized,
}

/// A registered unit whose factory has not completed
struct PendingModule {
    factory: Arc<dyn Factory>,
    /// Allocated when the factory starts; never replaced afterwards
    exports_in_progress: Option<Exports>,
    /// Thread the factory is running on; cleared if it fails
    running_on: Option<ThreadId>,
    /// Set once a re-entrant require handed out the in-progress container
    observed: bool,
}

enum ModuleRecord {
    Pending(PendingModule),
    Initialized(Exports),
}

/// What the initializer should do next for an id
pub(crate) enum Initialization {
    /// Already initialized
    Ready(Exports),
    /// Re-entered from a cycle: hand out the in-progress container
    Reentrant(Exports),
    /// Run the factory against a freshly allocated container
    Run {
        factory: Arc<dyn Factory>,
        exports: Exports,
    },
    /// Another thread is running the factory; wait and ask again
    Busy,
}

/// Authoritative lifecycle store: at most one record per id
#[derive(Default)]
pub struct ModuleRegistry {
    records: HashMap<ModuleId, ModuleRecord>,
    /// Threads parked on a factory running elsewhere
    waiting: HashMap<ThreadId, ModuleId>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifecycle state of `id`
    pub fn state(&self, id: &ModuleId) -> ModuleState {
        match self.records.get(id) {
            None => ModuleState::Unknown,
            Some(ModuleRecord::Pending(pending)) if pending.exports_in_progress.is_some() => {
                ModuleState::Initializing
            }
            Some(ModuleRecord::Pending(_)) => ModuleState::Pending,
            Some(ModuleRecord::Initialized(_)) => ModuleState::Initialized,
        }
    }

    /// Check if `id` is pending or initialized
    pub fn is_known(&self, id: &ModuleId) -> bool {
        self.records.contains_key(id)
    }

    /// Check if `id` has a pending record
    pub fn is_pending(&self, id: &ModuleId) -> bool {
        matches!(self.records.get(id), Some(ModuleRecord::Pending(_)))
    }

    /// Final exports of an initialized id
    pub fn exports(&self, id: &ModuleId) -> Option<Exports> {
        match self.records.get(id) {
            Some(ModuleRecord::Initialized(exports)) => Some(exports.clone()),
            _ => None,
        }
    }

    /// Every known id, initialized first, each group sorted
    pub fn ids(&self) -> Vec<ModuleId> {
        let (mut initialized, mut pending): (Vec<_>, Vec<_>) = self
            .records
            .iter()
            .partition(|(_, record)| matches!(record, ModuleRecord::Initialized(_)));
        initialized.sort_by(|a, b| a.0.cmp(b.0));
        pending.sort_by(|a, b| a.0.cmp(b.0));
        initialized
            .into_iter()
            .chain(pending)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of known ids
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is known
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a pending unit
    pub(crate) fn memoize(&mut self, id: ModuleId, factory: Arc<dyn Factory>) -> Result<()> {
        if self.records.contains_key(&id) {
            return Err(Error::AlreadyProvided(id.display_name().to_string()));
        }
        self.records.insert(
            id,
            ModuleRecord::Pending(PendingModule {
                factory,
                exports_in_progress: None,
                running_on: None,
                observed: false,
            }),
        );
        Ok(())
    }

    /// Decide how to initialize `id`, allocating its container on first entry.
    ///
    /// A require from the thread running the factory is a cycle. A require
    /// from any other thread waits for the factory, unless that thread is
    /// itself being waited on by the runner, which is a cycle spanning
    /// threads and is treated like a local one.
    pub(crate) fn begin_initialization(&mut self, id: &ModuleId) -> Result<Initialization> {
        let current = thread::current().id();
        self.waiting.remove(&current);

        let runner = match self.records.get(id) {
            None => return Err(Error::not_available(id.display_name())),
            Some(ModuleRecord::Initialized(exports)) => {
                return Ok(Initialization::Ready(exports.clone()));
            }
            Some(ModuleRecord::Pending(pending)) => pending.running_on,
        };
        if let Some(runner) = runner {
            if runner != current && !self.waits_on(runner, current) {
                self.waiting.insert(current, id.clone());
                return Ok(Initialization::Busy);
            }
        }

        let Some(ModuleRecord::Pending(pending)) = self.records.get_mut(id) else {
            return Err(Error::not_available(id.display_name()));
        };
        match &pending.exports_in_progress {
            Some(exports) => {
                pending.observed = true;
                Ok(Initialization::Reentrant(exports.clone()))
            }
            None => {
                let exports = Exports::for_module(id.clone());
                pending.exports_in_progress = Some(exports.clone());
                pending.running_on = Some(current);
                Ok(Initialization::Run {
                    factory: Arc::clone(&pending.factory),
                    exports,
                })
            }
        }
    }

    /// Check if `thread` is (transitively) waiting on a factory `target` runs
    fn waits_on(&self, thread: ThreadId, target: ThreadId) -> bool {
        let mut thread = thread;
        for _ in 0..=self.waiting.len() {
            if thread == target {
                return true;
            }
            let Some(id) = self.waiting.get(&thread) else {
                return false;
            };
            match self.records.get(id) {
                Some(ModuleRecord::Pending(PendingModule {
                    running_on: Some(runner),
                    ..
                })) => thread = *runner,
                _ => return false,
            }
        }
        false
    }

    /// Mark a failed factory as no longer running. Its container stays.
    pub(crate) fn abandon_initialization(&mut self, id: &ModuleId) {
        if let Some(ModuleRecord::Pending(pending)) = self.records.get_mut(id) {
            pending.running_on = None;
        }
    }

    /// Publish the final exports once the factory returned `result`
    pub(crate) fn complete_initialization(
        &mut self,
        id: &ModuleId,
        result: Option<Exports>,
    ) -> Result<Exports> {
        let Some(ModuleRecord::Pending(pending)) = self.records.get(id) else {
            return Err(Error::not_available(id.display_name()));
        };
        let Some(container) = &pending.exports_in_progress else {
            return Err(Error::not_available(id.display_name()));
        };

        let exports = match result {
            None => container.clone(),
            Some(result) if result.ptr_eq(container) => result,
            Some(_) if pending.observed => {
                return Err(Error::CircularExportsConflict(id.display_name().to_string()));
            }
            Some(result) => result,
        };

        self.records
            .insert(id.clone(), ModuleRecord::Initialized(exports.clone()));
        Ok(exports)
    }

    /// Forget every record
    pub fn clear(&mut self) {
        self.records.clear();
        self.waiting.clear();
    }
}
