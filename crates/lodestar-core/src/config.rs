// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Root directory used when none is configured.
pub const DEFAULT_ROOT_DIR: &str = "";

/// Suffix appended to a canonical id to form its resource locator.
pub const DEFAULT_EXTENSION: &str = ".js";

/// Diagnostic switches. Restored to the configured values on every reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOptions {
    /// Ask loaders to bypass any cache when fetching
    pub disable_caching: bool,

    /// Warn when a unit requires something it never declared
    pub warn_undeclared: bool,
}

impl DebugOptions {
    /// Apply a partial update.
    pub fn apply(&mut self, update: DebugOptionsUpdate) {
        if let Some(disable_caching) = update.disable_caching {
            self.disable_caching = disable_caching;
        }
        if let Some(warn_undeclared) = update.warn_undeclared {
            self.warn_undeclared = warn_undeclared;
        }
    }
}

/// Partial update of [`DebugOptions`]; `None` leaves a flag untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOptionsUpdate {
    /// New value for `disable_caching`
    pub disable_caching: Option<bool>,
    /// New value for `warn_undeclared`
    pub warn_undeclared: Option<bool>,
}

/// Configuration for a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Application root directory; bare identifiers resolve against it
    pub root_dir: String,

    /// Locator suffix
    pub extension: String,

    /// Diagnostic defaults
    pub debug: DebugOptions,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_dir: DEFAULT_ROOT_DIR.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            debug: DebugOptions::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file, then overlay the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: RuntimeConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.load_from_env();
        Ok(config)
    }

    /// Set the application root directory.
    pub fn with_root_dir(mut self, root_dir: impl Into<String>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    /// Set the locator suffix.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the diagnostic defaults.
    pub fn with_debug(mut self, debug: DebugOptions) -> Self {
        self.debug = debug;
        self
    }

    /// Load configuration from environment variables.
    pub fn load_from_env(&mut self) {
        if let Ok(root_dir) = std::env::var("LODESTAR_ROOT_DIR") {
            self.root_dir = root_dir;
        }

        if let Ok(extension) = std::env::var("LODESTAR_EXTENSION") {
            self.extension = extension;
        }

        if let Ok(value) = std::env::var("LODESTAR_DISABLE_CACHING") {
            self.debug.disable_caching = parse_bool(&value);
        }

        if let Ok(value) = std::env::var("LODESTAR_WARN_UNDECLARED") {
            self.debug.warn_undeclared = parse_bool(&value);
        }
    }
}

/// Parse a boolean value from string.
fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
