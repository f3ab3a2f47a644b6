// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module instantiation cache
//!
//! Each exact identifier gets one [`ModuleRecord`]. Instantiation is two-phase:
//! [`InstanceCache::reserve`] installs the record with empty exports, the
//! factory runs, then [`InstanceCache::populate`] marks it loaded. A factory
//! that requires a module still being instantiated (a cycle) gets the partial
//! exports from the reserved slot instead of recursing.

use crate::exports::ModuleRecord;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Outcome of reserving a slot for a module
#[derive(Debug, Clone)]
pub enum Reservation {
    /// Someone already reserved it; the record may still be loading
    Existing(Arc<ModuleRecord>),
    /// This caller owns the new slot and must run the factory
    Reserved(Arc<ModuleRecord>),
}

/// Thread-safe instance cache
#[derive(Default)]
pub struct InstanceCache {
    /// Exact identifier -> module record
    records: DashMap<String, Arc<ModuleRecord>>,
}

impl InstanceCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record for an identifier
    pub fn get(&self, id: &str) -> Option<Arc<ModuleRecord>> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    /// Phase one: install an empty record for `id` unless one exists
    pub fn reserve(&self, id: &str) -> Reservation {
        match self.records.entry(id.to_string()) {
            Entry::Occupied(entry) => Reservation::Existing(entry.get().clone()),
            Entry::Vacant(entry) => {
                let record = Arc::new(ModuleRecord::new(id));
                entry.insert(record.clone());
                Reservation::Reserved(record)
            }
        }
    }

    /// Phase two: the factory for `record` has finished
    pub fn populate(&self, record: &ModuleRecord) {
        record.mark_loaded();
    }

    /// Check if an identifier has been instantiated (or is being instantiated)
    pub fn has(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// All instantiated identifiers
    pub fn keys(&self) -> Vec<String> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
