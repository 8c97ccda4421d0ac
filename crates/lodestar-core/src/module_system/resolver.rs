// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Identifier resolution
//!
//! Purely lexical: no file system access, no package lookup. Relative
//! identifiers (`./x`, `../x`) resolve against the requesting unit's
//! directory; everything else resolves against the application root, even
//! when requested from a nested unit.

use crate::error::{Error, Result};
use crate::module_system::dependency::DependencyEntry;
use crate::module_system::id::{MAIN_MODULE_ID, ModuleId, Origin};

const TERM_DELIMITER: char = '/';
const CURRENT_DIRECTORY: &str = ".";
const PARENT_DIRECTORY: &str = "..";

/// Normalize a path into a canonical id.
///
/// Empty and `.` segments are dropped, `..` pops the previous segment.
/// Ascending past the first segment, or ending up with nothing, is an
/// [`Error::InvalidPath`].
pub fn canonicalize(path: &str) -> Result<ModuleId> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(TERM_DELIMITER) {
        if segment.is_empty() || segment == CURRENT_DIRECTORY {
            continue;
        }

        if segment == PARENT_DIRECTORY {
            if segments.pop().is_none() {
                return Err(Error::invalid_path(path));
            }
            continue;
        }

        segments.push(segment);
    }

    if segments.is_empty() {
        return Err(Error::invalid_path(path));
    }

    Ok(ModuleId::from_canonical(&segments.join("/")))
}

/// Parse a caller-supplied id: the main sentinel passes through unchanged,
/// anything else is canonicalized.
pub fn parse_id(id: &str) -> Result<ModuleId> {
    if id == MAIN_MODULE_ID {
        return Ok(ModuleId::main());
    }
    canonicalize(id)
}

/// Check if an identifier is relative to the requesting unit
fn is_relative(identifier: &str) -> bool {
    identifier.starts_with("./") || identifier.starts_with("../")
}

/// Resolves identifiers to canonical ids for one application root
#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    root_dir: String,
}

impl IdentifierResolver {
    /// Create a resolver rooted at `root_dir`
    pub fn new(root_dir: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// The application root directory
    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    /// Directory relative identifiers from `origin` resolve against
    pub fn base_directory<'a>(&'a self, origin: &'a Origin) -> &'a str {
        match origin {
            Origin::Ambient => &self.root_dir,
            Origin::Module(id) if id.is_main() => &self.root_dir,
            Origin::Module(id) => id.directory(),
        }
    }

    /// Resolve an identifier requested from `origin`
    pub fn resolve(&self, identifier: &str, origin: &Origin) -> Result<ModuleId> {
        self.resolve_in(identifier, self.base_directory(origin))
    }

    /// Resolve an identifier against an explicit base directory
    pub fn resolve_in(&self, identifier: &str, base_dir: &str) -> Result<ModuleId> {
        if identifier == MAIN_MODULE_ID {
            return Ok(ModuleId::main());
        }

        let path = if is_relative(identifier) {
            format!("{}{}{}", base_dir, TERM_DELIMITER, identifier)
        } else {
            format!("{}{}{}", self.root_dir, TERM_DELIMITER, identifier)
        };

        canonicalize(&path)
    }

    /// Resolve an identifier, first substituting it if it is a label in
    /// `declared`. Labeled identifiers resolve against `origin`'s
    /// directory like any other.
    pub fn resolve_with_alias(
        &self,
        identifier: &str,
        origin: &Origin,
        declared: &[DependencyEntry],
    ) -> Result<ModuleId> {
        let target = declared
            .iter()
            .find_map(|entry| entry.label(identifier))
            .unwrap_or(identifier);

        self.resolve(target, origin)
    }

    /// Resolve every identifier of a dependency list, in order
    pub fn expand(&self, dependencies: &[DependencyEntry], origin: &Origin) -> Result<Vec<ModuleId>> {
        let base_dir = self.base_directory(origin);
        dependencies
            .iter()
            .flat_map(|entry| entry.identifiers())
            .map(|identifier| self.resolve_in(identifier, base_dir))
            .collect()
    }
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ROOT_DIR)
    }
}
