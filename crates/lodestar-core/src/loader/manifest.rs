// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! JSON unit manifests
//!
//! ```json
//! {
//!   "dependencies": ["./b", { "log": "util/log" }],
//!   "imports": { "b": "./b", "logger": "log" },
//!   "exports": { "name": "a" },
//!   "returns": { "replaced": true }
//! }
//! ```
//!
//! Every field is optional. `imports` names are set to the exports of the
//! required unit; `exports` values are copied in as-is. With `returns` the
//! factory publishes a fresh container holding those values instead.

use crate::error::{Error, Result};
use crate::module_system::{DependencyList, Module, dependencies_from_json};
use crate::value::{Exports, Value};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawManifest {
    dependencies: serde_json::Value,
    imports: serde_json::Map<String, serde_json::Value>,
    exports: serde_json::Map<String, serde_json::Value>,
    returns: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A parsed unit manifest
#[derive(Debug, Clone, Default)]
pub struct UnitManifest {
    /// Declared dependencies
    pub dependencies: DependencyList,
    /// Export name → identifier to require
    pub imports: Vec<(String, String)>,
    /// Literal exports
    pub exports: Vec<(String, Value)>,
    /// Alternate exports, if the unit replaces its container
    pub returns: Option<Vec<(String, Value)>>,
}

fn literal_slots(map: &serde_json::Map<String, serde_json::Value>) -> Vec<(String, Value)> {
    map.iter()
        .map(|(name, value)| (name.clone(), Value::from(value)))
        .collect()
}

impl UnitManifest {
    /// Parse a manifest from JSON source
    pub fn parse(source: &str) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(source)?;

        let dependencies = dependencies_from_json(&raw.dependencies)?;
        let imports = raw
            .imports
            .iter()
            .map(|(name, identifier)| match identifier {
                serde_json::Value::String(identifier) => Ok((name.clone(), identifier.clone())),
                other => Err(Error::InvalidIdentifierType(other.to_string())),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            dependencies,
            imports,
            exports: literal_slots(&raw.exports),
            returns: raw.returns.as_ref().map(literal_slots),
        })
    }

    /// Declare this manifest through `module`
    pub fn declare(self, module: &Module) -> Result<()> {
        let Self {
            dependencies,
            imports,
            exports: literals,
            returns,
        } = self;
        let imports = Arc::new(imports);
        let literals = Arc::new(literals);
        let returns = Arc::new(returns);

        module.declare(dependencies, move |require, exports, _| {
            for (name, identifier) in imports.iter() {
                let dependency = require.require(identifier)?;
                exports.set(name.clone(), dependency);
            }
            for (name, value) in literals.iter() {
                exports.set(name.clone(), value.clone());
            }

            match &*returns {
                Some(slots) => {
                    let replacement = Exports::new();
                    for (name, value) in slots {
                        replacement.set(name.clone(), value.clone());
                    }
                    Ok(Some(replacement))
                }
                None => Ok(None),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_system::DependencyEntry;

    #[test]
    fn test_parse_full() {
        let manifest = UnitManifest::parse(
            r#"{
                "dependencies": ["./b", { "log": "util/log" }],
                "imports": { "b": "./b", "logger": "log" },
                "exports": { "name": "a" },
                "returns": { "replaced": true }
            }"#,
        )
        .unwrap();

        assert_eq!(
            manifest.dependencies,
            vec![
                DependencyEntry::plain("./b"),
                DependencyEntry::labeled([("log", "util/log")])
            ]
        );
        assert_eq!(manifest.imports.len(), 2);
        assert_eq!(manifest.exports.len(), 1);
        assert!(manifest.returns.is_some());
    }

    #[test]
    fn test_parse_empty() {
        let manifest = UnitManifest::parse("{}").unwrap();
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.returns.is_none());
    }

    #[test]
    fn test_bad_shapes() {
        assert!(matches!(
            UnitManifest::parse(r#"{ "imports": { "x": 3 } }"#),
            Err(Error::InvalidIdentifierType(_))
        ));
        assert!(matches!(
            UnitManifest::parse(r#"{ "dependencies": [1] }"#),
            Err(Error::InvalidDependencyListShape(_))
        ));
        assert!(matches!(
            UnitManifest::parse(r#"{ "dependencies": "a" }"#),
            Err(Error::InvalidDependencyListShape(_))
        ));
        assert!(matches!(UnitManifest::parse("not json"), Err(Error::Json(_))));
    }
}
