// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module runtime

use thiserror::Error;

/// Result type for module runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, provisioning or initializing units
#[derive(Debug, Error)]
pub enum Error {
    /// An identifier was not a string where a string is required
    #[error("TypeError: module identifier must be a string, got {0}")]
    InvalidIdentifierType(String),

    /// A dependency list contained something other than identifiers or label maps
    #[error("TypeError: dependencies must be an array of strings or labeled dependency objects ({0})")]
    InvalidDependencyListShape(String),

    /// Path ascended above the root, or canonicalized to nothing
    #[error("Invalid module path: {0}")]
    InvalidPath(String),

    /// Eager registration of an id that already has a record
    #[error("{0} is already provided.")]
    AlreadyProvided(String),

    /// Require of an id with no record
    #[error("Module \"{0}\" has not been provided and is not available.")]
    NotAvailable(String),

    /// A cyclic unit tried to replace exports already handed out
    #[error(
        "Module \"{0}\" contains circular dependencies that return alternate exports instead of using the exports object."
    )]
    CircularExportsConflict(String),

    /// A fetched resource never declared itself
    #[error("Requested module with \"{0}\", but it was not a valid module file.")]
    LoaderContractViolation(String),

    /// Capability object used after the generation it belongs to was reset
    #[error("Capability from generation {generation} used after reset")]
    StaleContext {
        /// Generation the capability was issued in
        generation: u64,
    },

    /// A loader failed to fetch or execute a resource
    #[error("Failed to load '{locator}': {reason}")]
    Load {
        /// Resource locator
        locator: String,
        /// Reason for failure
        reason: String,
    },

    /// Failure raised by unit code
    #[error("{0}")]
    Factory(String),

    /// Handle outlived the runtime it controls
    #[error("Runtime has shut down")]
    Shutdown,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a not-available error
    pub fn not_available(id: impl Into<String>) -> Self {
        Self::NotAvailable(id.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a load error
    pub fn load(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Create a factory error
    pub fn factory(msg: impl Into<String>) -> Self {
        Self::Factory(msg.into())
    }
}
