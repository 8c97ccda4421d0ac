// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Declared dependency entries

use crate::error::{Error, Result};

/// One entry of a unit's dependency list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyEntry {
    /// `"./b"` - a raw identifier
    Plain(String),
    /// `{ "log": "util/log" }` - local labels mapped to identifiers, in
    /// declaration order
    Labeled(Vec<(String, String)>),
}

/// A unit's ordered dependency list
pub type DependencyList = Vec<DependencyEntry>;

impl DependencyEntry {
    /// Plain identifier entry
    pub fn plain(identifier: impl Into<String>) -> Self {
        DependencyEntry::Plain(identifier.into())
    }

    /// Labeled entry
    pub fn labeled<L, I>(labels: impl IntoIterator<Item = (L, I)>) -> Self
    where
        L: Into<String>,
        I: Into<String>,
    {
        DependencyEntry::Labeled(
            labels
                .into_iter()
                .map(|(label, identifier)| (label.into(), identifier.into()))
                .collect(),
        )
    }

    /// Identifiers this entry refers to. Labels are not identifiers.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        let (plain, labeled) = match self {
            DependencyEntry::Plain(identifier) => (Some(identifier.as_str()), &[][..]),
            DependencyEntry::Labeled(labels) => (None, labels.as_slice()),
        };
        plain
            .into_iter()
            .chain(labeled.iter().map(|(_, identifier)| identifier.as_str()))
    }

    /// Identifier bound to `label`, if this entry declares it
    pub fn label(&self, label: &str) -> Option<&str> {
        match self {
            DependencyEntry::Plain(_) => None,
            DependencyEntry::Labeled(labels) => labels
                .iter()
                .find(|(name, _)| name == label)
                .map(|(_, identifier)| identifier.as_str()),
        }
    }

    /// Parse one entry from JSON: a string, or an object whose values are
    /// all strings
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::String(identifier) => Ok(DependencyEntry::Plain(identifier.clone())),
            serde_json::Value::Object(map) => {
                let mut labels = Vec::with_capacity(map.len());
                for (label, identifier) in map {
                    match identifier {
                        serde_json::Value::String(identifier) => {
                            labels.push((label.clone(), identifier.clone()))
                        }
                        other => {
                            return Err(Error::InvalidDependencyListShape(format!(
                                "label '{}' maps to {}",
                                label, other
                            )));
                        }
                    }
                }
                Ok(DependencyEntry::Labeled(labels))
            }
            other => Err(Error::InvalidDependencyListShape(format!(
                "unexpected entry {}",
                other
            ))),
        }
    }
}

/// Parse a whole dependency list from JSON
pub fn dependencies_from_json(json: &serde_json::Value) -> Result<DependencyList> {
    match json {
        serde_json::Value::Array(entries) => entries.iter().map(DependencyEntry::from_json).collect(),
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(Error::InvalidDependencyListShape(format!(
            "expected an array, got {}",
            other
        ))),
    }
}
