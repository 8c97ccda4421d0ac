// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! File system loader

use crate::error::{Error, Result};
use crate::loader::manifest::UnitManifest;
use crate::loader::{LoadRequest, Loader};
use crate::module_system::Module;
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Loads unit manifests from `<base dir>/<locator>`.
///
/// Sources are cached per locator until a request asks to bypass the cache.
pub struct FsLoader {
    base_dir: PathBuf,
    sources: DashMap<String, Arc<str>>,
}

impl FsLoader {
    /// Create a loader reading below `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            sources: DashMap::new(),
        }
    }

    /// Directory locators are read from
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of cached sources
    pub fn cached(&self) -> usize {
        self.sources.len()
    }

    /// Drop cached sources
    pub fn clear_cache(&self) {
        self.sources.clear();
    }

    #[instrument(skip(self))]
    async fn read_source(&self, request: &LoadRequest) -> Result<Arc<str>> {
        let key = request.locator.as_str();
        if !request.bypass_cache {
            if let Some(source) = self.sources.get(key) {
                trace!(locator = %request.locator, "source cache hit");
                return Ok(Arc::clone(source.value()));
            }
        }

        let path = self.base_dir.join(key);
        debug!(path = %path.display(), href = %request.href, "reading unit");
        let source: Arc<str> = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::load(request.href.as_str(), e.to_string()))?
            .into();

        self.sources.insert(key.to_string(), Arc::clone(&source));
        Ok(source)
    }
}

#[async_trait]
impl Loader for FsLoader {
    async fn load(&self, request: LoadRequest, module: Module) -> Result<()> {
        let source = self.read_source(&request).await?;
        let manifest = UnitManifest::parse(&source)
            .map_err(|e| Error::load(request.locator.as_str(), e.to_string()))?;
        manifest.declare(&module)
    }
}
