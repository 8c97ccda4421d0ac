// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resource loaders
//!
//! A [`Loader`] fetches the resource behind a locator and executes it. The
//! executed resource is expected to call [`Module::declare`] on the view it
//! is handed; a resource that loads cleanly but never declares anything is
//! reported as a contract violation and its id stays unknown.

mod fs;
mod manifest;
mod memory;

pub use fs::FsLoader;
pub use manifest::UnitManifest;
pub use memory::{MemoryLoader, UnitScript};

use crate::error::Result;
use crate::module_system::{Locator, Module};
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

/// Query prefix appended to hrefs when caching is disabled
const CACHE_BUST_PREFIX: &str = "?___________________________________";

/// One fetch, as handed to a [`Loader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Deduplication key: the canonical id plus the configured extension
    pub locator: Locator,
    /// What to actually fetch. Carries a cache-busting suffix when
    /// `bypass_cache` is set.
    pub href: String,
    /// Skip any caching the loader does
    pub bypass_cache: bool,
}

impl LoadRequest {
    /// Build the request for `locator`
    pub fn new(locator: Locator, bypass_cache: bool) -> Self {
        let href = if bypass_cache {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            format!("{}{}{}", locator, CACHE_BUST_PREFIX, millis)
        } else {
            locator.to_string()
        };

        Self {
            locator,
            href,
            bypass_cache,
        }
    }
}

/// Fetches and executes unit resources
#[async_trait]
pub trait Loader: Send + Sync {
    /// Fetch `request` and run it against `module`, the view of the unit
    /// being loaded
    async fn load(&self, request: LoadRequest, module: Module) -> Result<()>;
}
