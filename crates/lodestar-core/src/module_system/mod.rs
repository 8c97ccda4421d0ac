// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module system implementation
//!
//! Units declare a dependency list and a factory. The system:
//!
//! - resolves identifiers to canonical ids (`./` and `../` relative to the
//!   requesting unit, everything else relative to the application root)
//! - provisions units asynchronously, fetching each locator at most once
//! - initializes units lazily on first `require`, tolerating cycles by
//!   handing out in-progress exports

mod dependency;
mod factory;
mod graph;
mod id;
mod initializer;
mod module;
mod provision;
mod registry;
mod require;
mod resolver;

pub use dependency::{DependencyEntry, DependencyList, dependencies_from_json};
pub use factory::Factory;
pub use graph::DependencyGraph;
pub use id::{Locator, MAIN_MODULE_ID, ModuleId, Origin};
pub use module::Module;
pub use provision::{LoadTracker, ProvisionCoordinator};
pub use registry::{ModuleRegistry, ModuleState};
pub use require::Require;
pub use resolver::{IdentifierResolver, canonicalize, parse_id};
