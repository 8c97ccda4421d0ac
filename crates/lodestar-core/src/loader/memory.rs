// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! In-process loader

use crate::error::{Error, Result};
use crate::loader::manifest::UnitManifest;
use crate::loader::{LoadRequest, Loader};
use crate::module_system::{DependencyList, Factory, Module, Require};
use crate::value::Exports;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Body of an in-process unit: runs against the loading unit's view
pub type UnitScript = Arc<dyn Fn(&Module) -> Result<()> + Send + Sync>;

/// Loader serving unit scripts registered in memory, keyed by locator.
///
/// Every fetch yields to the scheduler once before running the script, so
/// concurrent batches really do overlap.
#[derive(Default)]
pub struct MemoryLoader {
    scripts: DashMap<String, UnitScript>,
    fetches: DashMap<String, usize>,
}

impl MemoryLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `script` for `locator`
    pub fn insert<S>(&self, locator: impl Into<String>, script: S)
    where
        S: Fn(&Module) -> Result<()> + Send + Sync + 'static,
    {
        self.scripts.insert(locator.into(), Arc::new(script));
    }

    /// Serve a unit that declares `dependencies` and `factory`
    pub fn insert_unit<F>(&self, locator: impl Into<String>, dependencies: DependencyList, factory: F)
    where
        F: Fn(&Require, &Exports, &Module) -> Result<Option<Exports>> + Send + Sync + 'static,
    {
        let factory: Arc<dyn Factory> = Arc::new(factory);
        self.insert(locator, move |module| {
            module.declare_factory(dependencies.clone(), Arc::clone(&factory))
        });
    }

    /// Serve a JSON manifest
    pub fn insert_manifest(&self, locator: impl Into<String>, source: &str) -> Result<()> {
        let manifest = UnitManifest::parse(source)?;
        self.insert(locator, move |module| manifest.clone().declare(module));
        Ok(())
    }

    /// Number of fetches issued for `locator`
    pub fn fetch_count(&self, locator: &str) -> usize {
        self.fetches.get(locator).map(|count| *count).unwrap_or(0)
    }

    /// Total fetches across all locators
    pub fn total_fetches(&self) -> usize {
        self.fetches.iter().map(|entry| *entry.value()).sum()
    }
}

#[async_trait]
impl Loader for MemoryLoader {
    async fn load(&self, request: LoadRequest, module: Module) -> Result<()> {
        *self
            .fetches
            .entry(request.locator.to_string())
            .or_insert(0) += 1;

        tokio::task::yield_now().await;

        let script = self
            .scripts
            .get(request.locator.as_str())
            .map(|script| Arc::clone(script.value()))
            .ok_or_else(|| Error::load(request.href.as_str(), "no such unit"))?;

        trace!(locator = %request.locator, "running unit script");
        script(&module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::module_system::DependencyEntry;
    use crate::runtime::Runtime;

    #[tokio::test]
    async fn test_counts_fetches() {
        let loader = Arc::new(MemoryLoader::new());
        loader.insert_unit("a.js", Vec::new(), |_, _, _| Ok(None));
        let runtime = Runtime::new(RuntimeConfig::default(), loader.clone());

        runtime
            .module()
            .provide(vec![DependencyEntry::plain("a"), DependencyEntry::plain("missing")])
            .await
            .unwrap();

        assert_eq!(loader.fetch_count("a.js"), 1);
        assert_eq!(loader.fetch_count("missing.js"), 1);
        assert_eq!(loader.total_fetches(), 2);
        assert!(runtime.require().is_memoized("a").unwrap());
        assert!(!runtime.require().is_memoized("missing").unwrap());
    }

    #[tokio::test]
    async fn test_manifest_unit() {
        let loader = Arc::new(MemoryLoader::new());
        loader
            .insert_manifest("lib/a.js", r#"{ "exports": { "name": "a" } }"#)
            .unwrap();
        let runtime = Runtime::new(RuntimeConfig::default(), loader);

        runtime
            .module()
            .provide(vec![DependencyEntry::plain("lib/a")])
            .await
            .unwrap();
        let a = runtime.require().require("lib/a").unwrap();
        assert_eq!(a.get("name").and_then(|v| v.as_str().map(String::from)), Some("a".into()));
    }
}
