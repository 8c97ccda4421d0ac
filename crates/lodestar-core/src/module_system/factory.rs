// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Unit factories

use crate::error::Result;
use crate::module_system::module::Module;
use crate::module_system::require::Require;
use crate::value::Exports;

/// Computes a unit's exports.
///
/// Called at most once per unit, with a [`Require`] scoped to the unit, the
/// unit's exports container, and the unit's [`Module`] view. Returning
/// `Ok(None)` publishes the (mutated) container; returning another
/// container publishes that instead.
pub trait Factory: Send + Sync {
    /// Run the factory
    fn call(&self, require: &Require, exports: &Exports, module: &Module) -> Result<Option<Exports>>;
}

impl<F> Factory for F
where
    F: Fn(&Require, &Exports, &Module) -> Result<Option<Exports>> + Send + Sync,
{
    fn call(&self, require: &Require, exports: &Exports, module: &Module) -> Result<Option<Exports>> {
        self(require, exports, module)
    }
}
