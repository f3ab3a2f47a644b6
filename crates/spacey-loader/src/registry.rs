// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Registry of module factories, keyed by exact identifier

use crate::exports::{Exports, ModuleRecord};
use crate::loader::Require;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// A module's initialization code.
///
/// Receives the module's record, its exports object, and a `require`
/// capability for pulling in dependencies.
pub type Factory =
    Arc<dyn Fn(&ModuleRecord, &Exports, &Require) -> anyhow::Result<()> + Send + Sync>;

/// Box a closure up as a [`Factory`]
pub fn factory<F>(f: F) -> Factory
where
    F: Fn(&ModuleRecord, &Exports, &Require) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Registered module factories.
///
/// Append-only: once an identifier has a factory it keeps it.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: DashMap<String, Factory>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `id` unless something is already there.
    ///
    /// Returns `true` if this call registered the factory.
    pub fn define(&self, id: &str, factory: Factory) -> bool {
        match self.factories.entry(id.to_string()) {
            Entry::Occupied(_) => {
                debug!("Ignoring duplicate definition of {}", id);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(factory);
                true
            }
        }
    }

    /// Get the factory registered under an exact identifier
    pub fn get(&self, id: &str) -> Option<Factory> {
        self.factories.get(id).map(|entry| entry.value().clone())
    }

    /// Check if an exact identifier is registered
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// All registered identifiers
    pub fn ids(&self) -> Vec<String> {
        self.factories.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
