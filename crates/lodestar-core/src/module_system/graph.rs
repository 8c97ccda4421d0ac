// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Declared dependency lists, per unit

use crate::error::{Error, Result};
use crate::module_system::dependency::{DependencyEntry, DependencyList};
use crate::module_system::id::{ModuleId, Origin};
use crate::module_system::resolver::IdentifierResolver;
use std::collections::HashMap;

/// Stores each unit's declared (unresolved) dependency list and answers
/// label lookups against it
#[derive(Debug, Default)]
pub struct DependencyGraph {
    resolver: IdentifierResolver,
    lists: HashMap<ModuleId, DependencyList>,
}

impl DependencyGraph {
    /// Create an empty graph resolving against `resolver`'s root
    pub fn new(resolver: IdentifierResolver) -> Self {
        Self {
            resolver,
            lists: HashMap::new(),
        }
    }

    /// The resolver
    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    /// Record `id`'s dependency list. A list is fixed once recorded.
    pub fn set_dependencies(&mut self, id: ModuleId, dependencies: DependencyList) -> Result<()> {
        if self.lists.contains_key(&id) {
            return Err(Error::AlreadyProvided(id.display_name().to_string()));
        }
        self.lists.insert(id, dependencies);
        Ok(())
    }

    /// Declared list for `origin`. The ambient context declares nothing.
    pub fn dependencies(&self, origin: &Origin) -> &[DependencyEntry] {
        match origin {
            Origin::Ambient => &[],
            Origin::Module(id) => self.lists.get(id).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Copy of the declared list for `origin`
    pub fn get_dependencies(&self, origin: &Origin) -> DependencyList {
        self.dependencies(origin).to_vec()
    }

    /// Resolve every identifier of `dependencies` relative to `origin`
    pub fn expand_to_canonical_ids(
        &self,
        dependencies: &[DependencyEntry],
        origin: &Origin,
    ) -> Result<Vec<ModuleId>> {
        self.resolver.expand(dependencies, origin)
    }

    /// Resolve an identifier requested from `origin`, honoring its labels
    pub fn resolve(&self, identifier: &str, origin: &Origin) -> Result<ModuleId> {
        self.resolver
            .resolve_with_alias(identifier, origin, self.dependencies(origin))
    }

    /// Check whether `origin` declared `id` among its dependencies
    pub fn declares(&self, origin: &Origin, id: &ModuleId) -> Result<bool> {
        let declared = self.expand_to_canonical_ids(self.dependencies(origin), origin)?;
        Ok(declared.contains(id))
    }

    /// Forget every list
    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
