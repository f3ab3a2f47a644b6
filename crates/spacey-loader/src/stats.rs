// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader counters

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for loader activity
#[derive(Debug, Default)]
pub struct LoaderStats {
    /// Bundle fetches kicked off
    pub fetches_started: AtomicUsize,
    /// Bundle fetches that reported failure
    pub fetches_failed: AtomicUsize,
    /// Module factories invoked
    pub factories_run: AtomicUsize,
    /// `require()` calls served from the instance cache
    pub instance_hits: AtomicUsize,
}

impl LoaderStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a started fetch
    pub fn inc_fetch(&self) {
        self.fetches_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed fetch
    pub fn inc_fetch_failed(&self) {
        self.fetches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a factory invocation
    pub fn inc_factory(&self) {
        self.factories_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an instance cache hit
    pub fn inc_instance_hit(&self) {
        self.instance_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Fetches started so far
    pub fn fetches(&self) -> usize {
        self.fetches_started.load(Ordering::Relaxed)
    }

    /// Factories run so far
    pub fn factories(&self) -> usize {
        self.factories_run.load(Ordering::Relaxed)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Fetches: {}, Failed: {}, Factories run: {}, Cache hits: {}",
            self.fetches_started.load(Ordering::Relaxed),
            self.fetches_failed.load(Ordering::Relaxed),
            self.factories_run.load(Ordering::Relaxed),
            self.instance_hits.load(Ordering::Relaxed),
        )
    }
}
