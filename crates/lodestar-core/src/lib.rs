// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # lodestar-core
//!
//! A dynamic module-loading runtime: units declare dependency lists and
//! factories, get fetched on demand, and are initialized lazily on first
//! `require`.
//!
//! - Path-style identifiers (`./x`, `../x` relative to the requesting
//!   unit, anything else relative to the application root)
//! - Labeled dependencies (`{ "log": "util/log" }` lets a unit
//!   `require("log")`)
//! - Asynchronous provisioning with one fetch per locator, however many
//!   batches ask for it
//! - Cycle-tolerant initialization: units in a cycle share in-progress
//!   exports
//! - Generations: a reset drops every unit and invalidates old views
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lodestar_core::{DependencyEntry, MemoryLoader, Runtime, RuntimeConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> lodestar_core::Result<()> {
//!     let loader = Arc::new(MemoryLoader::new());
//!     loader.insert_unit("greeting.js", Vec::new(), |_, exports, _| {
//!         exports.set("text", "hello");
//!         Ok(None)
//!     });
//!
//!     let runtime = Runtime::new(RuntimeConfig::default(), loader);
//!     runtime.module().declare(vec![DependencyEntry::plain("greeting")], |require, exports, _| {
//!         exports.set("greeting", require.require("greeting")?);
//!         Ok(None)
//!     })?;
//!
//!     let main = runtime.run_main().await?;
//!     println!("{}", main.to_json());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod loader;
pub mod module_system;
pub mod runtime;
pub mod value;

// Re-exports
pub use config::{DebugOptions, DebugOptionsUpdate, RuntimeConfig};
pub use error::{Error, Result};
pub use loader::{FsLoader, LoadRequest, Loader, MemoryLoader, UnitManifest};
pub use module_system::{
    DependencyEntry, DependencyList, Factory, Locator, Module, ModuleId, ModuleState, Origin,
    Require,
};
pub use runtime::{DEBUG_MODULE_ID, Debug, Generation, Runtime};
pub use value::{Exports, NativeValue, Value};

/// Version of the lodestar runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
