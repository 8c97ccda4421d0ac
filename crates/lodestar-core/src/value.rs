// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Exported values
//!
//! A unit's public value is an [`Exports`] container: a set of named slots
//! shared by reference. Cloning an `Exports` never copies the slots, so two
//! clones are the same module value and [`Exports::ptr_eq`] holds between
//! them. That identity is what the initializer relies on when units in a
//! cycle hand each other partially populated exports.

use crate::module_system::ModuleId;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A value stored in an exports slot
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Boolean(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Ordered list
    Array(Vec<Value>),
    /// Plain record
    Object(BTreeMap<String, Value>),
    /// Another unit's exports, by reference
    Module(Exports),
    /// Opaque host value
    Native(NativeValue),
}

impl Value {
    /// Borrow the exports if this is a module reference
    pub fn as_module(&self) -> Option<&Exports> {
        match self {
            Value::Module(exports) => Some(exports),
            _ => None,
        }
    }

    /// Borrow the string contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric contents
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Downcast a native value
    pub fn downcast_native<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Value::Native(native) => native.downcast(),
            _ => None,
        }
    }

    /// Render as JSON. Module references render as a marker rather than
    /// being expanded, which keeps cyclic exports finite.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                serde_json::Value::Number((*n as i64).into())
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Module(exports) => serde_json::Value::String(exports.to_string()),
            Value::Native(_) => serde_json::Value::String("[native]".to_string()),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => Value::Array(arr.iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => Value::Object(
                obj.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Exports> for Value {
    fn from(exports: Exports) -> Self {
        Value::Module(exports)
    }
}

/// An opaque host value carried in an exports slot
#[derive(Clone)]
pub struct NativeValue(Arc<dyn Any + Send + Sync>);

impl NativeValue {
    /// Wrap a host value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Downcast to a concrete type
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[native]")
    }
}

struct ExportsInner {
    /// Unit the container was allocated for, if any
    owner: Option<ModuleId>,
    slots: RwLock<BTreeMap<String, Value>>,
}

/// A unit's exports container. Clones share identity.
#[derive(Clone)]
pub struct Exports(Arc<ExportsInner>);

impl Exports {
    /// Create a fresh, unowned container (alternate exports)
    pub fn new() -> Self {
        Self(Arc::new(ExportsInner {
            owner: None,
            slots: RwLock::new(BTreeMap::new()),
        }))
    }

    /// Create the container handed to a unit's factory
    pub(crate) fn for_module(id: ModuleId) -> Self {
        Self(Arc::new(ExportsInner {
            owner: Some(id),
            slots: RwLock::new(BTreeMap::new()),
        }))
    }

    /// Unit this container was allocated for
    pub fn owner(&self) -> Option<&ModuleId> {
        self.0.owner.as_ref()
    }

    /// Get a slot
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.slots.read().get(name).cloned()
    }

    /// Set a slot
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.slots.write().insert(name.into(), value.into());
    }

    /// Remove a slot
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.0.slots.write().remove(name)
    }

    /// Check if a slot exists
    pub fn contains(&self, name: &str) -> bool {
        self.0.slots.read().contains_key(name)
    }

    /// Slot names in order
    pub fn keys(&self) -> Vec<String> {
        self.0.slots.read().keys().cloned().collect()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.0.slots.read().len()
    }

    /// Check if the container has no slots
    pub fn is_empty(&self) -> bool {
        self.0.slots.read().is_empty()
    }

    /// Reference identity
    pub fn ptr_eq(&self, other: &Exports) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Render this container's slots as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .slots
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl Default for Exports {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.owner {
            Some(id) => write!(f, "[module {}]", id.display_name()),
            None => f.write_str("[module]"),
        }
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Slots are not expanded: they may point back at this container.
        f.debug_struct("Exports")
            .field("owner", &self.0.owner)
            .field("keys", &self.keys())
            .finish()
    }
}
