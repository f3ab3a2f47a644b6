// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module exports and module records

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single exported value
pub type ExportValue = Arc<dyn Any + Send + Sync>;

/// A module's exports object.
///
/// Cloning hands out another reference to the same underlying object, the
/// way `module.exports` is shared between every caller of `require()`.
#[derive(Clone, Default)]
pub struct Exports {
    inner: Arc<RwLock<HashMap<String, ExportValue>>>,
}

impl Exports {
    /// Create an empty exports object
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an export
    pub fn set<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.inner.write().insert(name.into(), Arc::new(value));
    }

    /// Set an export from an already shared value
    pub fn set_shared(&self, name: impl Into<String>, value: ExportValue) {
        self.inner.write().insert(name.into(), value);
    }

    /// Get an export by name, typed
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let value = self.inner.read().get(name).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Get an export by name, untyped
    pub fn get_shared(&self, name: &str) -> Option<ExportValue> {
        self.inner.read().get(name).cloned()
    }

    /// Check if an export exists
    pub fn has(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// All export names, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of exports
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if nothing has been exported
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Whether both handles refer to the same exports object
    pub fn ptr_eq(&self, other: &Exports) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Collect the exports that hold JSON values into a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .inner
            .read()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .downcast_ref::<serde_json::Value>()
                    .map(|json| (key.clone(), json.clone()))
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exports").field("keys", &self.keys()).finish()
    }
}

/// Instantiation record for one exact module identifier
#[derive(Debug)]
pub struct ModuleRecord {
    id: String,
    exports: Exports,
    loaded: AtomicBool,
}

impl ModuleRecord {
    /// Create a record with empty exports that has not run yet
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            exports: Exports::new(),
            loaded: AtomicBool::new(false),
        }
    }

    /// The exact module identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The module's exports object
    pub fn exports(&self) -> &Exports {
        &self.exports
    }

    /// Whether the factory has finished
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let exports = Exports::new();
        let alias = exports.clone();
        alias.set("answer", 42u32);

        assert!(exports.ptr_eq(&alias));
        assert_eq!(*exports.get::<u32>("answer").unwrap(), 42);
        assert!(exports.get::<String>("answer").is_none());
    }

    #[test]
    fn test_to_json_skips_opaque_values() {
        let exports = Exports::new();
        exports.set("name", serde_json::json!("left-pad"));
        exports.set("pad", |s: &str| format!(" {}", s));

        assert_eq!(exports.to_json(), serde_json::json!({ "name": "left-pad" }));
        assert_eq!(exports.keys(), vec!["name".to_string(), "pad".to_string()]);
    }

    #[test]
    fn test_record_starts_unloaded() {
        let record = ModuleRecord::new("pkg@1.0.0");
        assert_eq!(record.id(), "pkg@1.0.0");
        assert!(!record.is_loaded());
        assert!(record.exports().is_empty());

        record.mark_loaded();
        assert!(record.is_loaded());
    }
}
