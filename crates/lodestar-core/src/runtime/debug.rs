// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The built-in `lodestar/debug` unit

use super::{Generation, RuntimeInner};
use crate::config::DebugOptionsUpdate;
use crate::error::{Error, Result};
use crate::module_system::{Module, ModuleId, Origin, Require};
use crate::value::{Exports, NativeValue, Value};
use std::sync::{Arc, Weak};
use tracing::warn;

/// Id of the built-in debug unit
pub const DEBUG_MODULE_ID: &str = "lodestar/debug";

/// Export slot holding the [`Debug`] handle
const HANDLE_SLOT: &str = "handle";

/// Operator handle: list units, toggle diagnostics, reset.
///
/// Every generation memoizes `lodestar/debug`, whose exports carry one of
/// these. The handle follows the runtime across resets.
#[derive(Clone)]
pub struct Debug {
    runtime: Weak<RuntimeInner>,
}

impl Debug {
    pub(crate) fn new(runtime: Weak<RuntimeInner>) -> Self {
        Self { runtime }
    }

    /// Extract the handle from the debug unit's exports
    pub fn from_exports(exports: &Exports) -> Option<Arc<Debug>> {
        exports.get(HANDLE_SLOT)?.downcast_native::<Debug>()
    }

    fn runtime(&self) -> Result<Arc<RuntimeInner>> {
        self.runtime.upgrade().ok_or(Error::Shutdown)
    }

    /// Every known id, initialized first
    pub fn list_modules(&self) -> Result<Vec<ModuleId>> {
        Ok(self.runtime()?.generation().list_modules())
    }

    /// Update diagnostic switches
    pub fn set_options(&self, update: DebugOptionsUpdate) -> Result<()> {
        self.runtime()?.set_debug_options(update);
        Ok(())
    }

    /// Reset the runtime, optionally re-rooting it
    pub fn reset(&self, root_dir: Option<&str>) -> Result<()> {
        self.runtime()?.reset(root_dir);
        Ok(())
    }
}

impl std::fmt::Debug for Debug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debug")
            .field("attached", &(self.runtime.strong_count() > 0))
            .finish()
    }
}

/// Memoize the debug unit into a fresh generation, under whatever id
/// `lodestar/debug` resolves to from the ambient context
pub(super) fn install(generation: &Arc<Generation>, runtime: Weak<RuntimeInner>) {
    if let Err(e) = memoize_handle(generation, Debug::new(runtime)) {
        warn!(error = %e, "could not install {}", DEBUG_MODULE_ID);
    }
}

fn memoize_handle(generation: &Arc<Generation>, handle: Debug) -> Result<()> {
    let mut state = generation.state();
    let id = state.graph.resolve(DEBUG_MODULE_ID, &Origin::Ambient)?;
    state.memoize(
        id,
        Vec::new(),
        Arc::new(move |_: &Require, exports: &Exports, _: &Module| -> Result<Option<Exports>> {
            exports.set(HANDLE_SLOT, Value::Native(NativeValue::new(handle.clone())));
            Ok(None)
        }),
    )
}
