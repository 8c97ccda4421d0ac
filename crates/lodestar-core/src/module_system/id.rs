// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Canonical module ids and binding contexts

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Id of the main unit: the empty string.
pub const MAIN_MODULE_ID: &str = "";

/// A canonical module id.
///
/// Either a `/`-delimited, non-empty path with no `.` or `..` segments,
/// or the empty sentinel naming the main unit. Only the resolver builds
/// these from user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    /// The main unit's id
    pub fn main() -> Self {
        Self(Arc::from(MAIN_MODULE_ID))
    }

    /// Wrap a string already known to be canonical
    pub(crate) fn from_canonical(id: &str) -> Self {
        Self(Arc::from(id))
    }

    /// Check if this is the main unit
    pub fn is_main(&self) -> bool {
        self.0.is_empty()
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable name; the main unit has no path to show
    pub fn display_name(&self) -> &str {
        if self.is_main() { "<main>" } else { &self.0 }
    }

    /// Directory portion: everything before the last segment, or `.` when
    /// there is no separator
    pub fn directory(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) if pos > 0 => &self.0[..pos],
            _ => ".",
        }
    }

    /// Resource locator: the id with a fixed suffix appended
    pub fn locator(&self, extension: &str) -> Locator {
        Locator(format!("{}{}", self.0, extension))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The context a capability object is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Top-level evaluation outside any declared unit
    Ambient,
    /// A declared unit (including the main unit)
    Module(ModuleId),
}

impl Origin {
    /// The bound unit, if any
    pub fn module_id(&self) -> Option<&ModuleId> {
        match self {
            Origin::Ambient => None,
            Origin::Module(id) => Some(id),
        }
    }

    /// Check if this is the ambient context
    pub fn is_ambient(&self) -> bool {
        matches!(self, Origin::Ambient)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Ambient => f.write_str("<ambient>"),
            Origin::Module(id) if id.is_main() => f.write_str("<main>"),
            Origin::Module(id) => write!(f, "\"{}\"", id),
        }
    }
}

/// Where a unit's source lives, derived from its id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(String);

impl Locator {
    /// The locator as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory() {
        assert_eq!(ModuleId::from_canonical("a/b/c").directory(), "a/b");
        assert_eq!(ModuleId::from_canonical("a/b").directory(), "a");
        assert_eq!(ModuleId::from_canonical("a").directory(), ".");
    }

    #[test]
    fn test_locator() {
        let id = ModuleId::from_canonical("lib/util");
        assert_eq!(id.locator(".js").as_str(), "lib/util.js");
        assert_eq!(ModuleId::main().locator(".js").as_str(), ".js");
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(Origin::Ambient.to_string(), "<ambient>");
        assert_eq!(Origin::Module(ModuleId::main()).to_string(), "<main>");
        assert_eq!(
            Origin::Module(ModuleId::from_canonical("a/b")).to_string(),
            "\"a/b\""
        );
    }
}
