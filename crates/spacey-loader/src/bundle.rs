// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bundle load-state tracking
//!
//! Every bundle path moves through `absent -> loading -> loaded | failed` and
//! never back. While loading, callers queue continuations; when the single
//! fetch completes they are handed back in registration order.

use crate::error::BundleError;
use crate::loader::Require;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Continuation invoked once a bundle is ready (or failed)
pub type BundleCallback = Box<dyn FnOnce(Result<Require, BundleError>) + Send>;

/// Internal per-path state; absent paths have no entry
enum BundleState {
    Loading(Vec<BundleCallback>),
    Loaded,
    Failed(BundleError),
}

/// Observable state of a bundle path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleStatus {
    /// Never requested
    Absent,
    /// Fetch in flight with this many queued continuations
    Loading {
        /// Number of queued continuations
        waiters: usize,
    },
    /// Fetched successfully
    Loaded,
    /// Fetch failed; the error is replayed to later requests
    Failed(BundleError),
}

/// What the caller of [`BundleTable::request`] has to do next
pub enum Admission {
    /// First request for the path: start the one and only fetch
    Fetch,
    /// Continuation queued behind an in-flight fetch
    Queued,
    /// Already loaded: run the continuation now
    Ready(BundleCallback),
    /// Already failed: run the continuation now with the error
    Failed(BundleCallback, BundleError),
}

impl fmt::Debug for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("Fetch"),
            Self::Queued => f.write_str("Queued"),
            Self::Ready(_) => f.write_str("Ready"),
            Self::Failed(_, err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Load state of every requested bundle
#[derive(Default)]
pub struct BundleTable {
    states: Mutex<HashMap<String, BundleState>>,
}

impl BundleTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `path`.
    ///
    /// The lock is released before returning, so continuations handed back
    /// in [`Admission::Ready`] or [`Admission::Failed`] can re-enter the table.
    pub fn request(&self, path: &str, callback: BundleCallback) -> Admission {
        let mut states = self.states.lock();
        match states.get_mut(path) {
            None => {
                states.insert(path.to_string(), BundleState::Loading(vec![callback]));
                Admission::Fetch
            }
            Some(BundleState::Loading(waiters)) => {
                waiters.push(callback);
                Admission::Queued
            }
            Some(BundleState::Loaded) => Admission::Ready(callback),
            Some(BundleState::Failed(err)) => Admission::Failed(callback, err.clone()),
        }
    }

    /// Record the fetch outcome for `path` and drain its waiters, oldest first.
    pub fn finish(&self, path: &str, outcome: &Result<(), BundleError>) -> Vec<BundleCallback> {
        let next = match outcome {
            Ok(()) => BundleState::Loaded,
            Err(err) => BundleState::Failed(err.clone()),
        };

        let mut states = self.states.lock();
        match states.insert(path.to_string(), next) {
            Some(BundleState::Loading(waiters)) => waiters,
            Some(settled) => {
                warn!("Bundle {} finished twice; keeping the first outcome", path);
                states.insert(path.to_string(), settled);
                Vec::new()
            }
            None => {
                warn!("Bundle {} finished without being requested", path);
                Vec::new()
            }
        }
    }

    /// Current state of `path`
    pub fn status(&self, path: &str) -> BundleStatus {
        match self.states.lock().get(path) {
            None => BundleStatus::Absent,
            Some(BundleState::Loading(waiters)) => BundleStatus::Loading {
                waiters: waiters.len(),
            },
            Some(BundleState::Loaded) => BundleStatus::Loaded,
            Some(BundleState::Failed(err)) => BundleStatus::Failed(err.clone()),
        }
    }

    /// Paths that finished loading successfully
    pub fn loaded_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .states
            .lock()
            .iter()
            .filter(|(_, state)| matches!(state, BundleState::Loaded))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> BundleCallback {
        let log = log.clone();
        let tag = tag.to_string();
        Box::new(move |outcome: Result<Require, BundleError>| {
            let label = match outcome {
                Ok(_) => format!("{tag}:ok"),
                Err(_) => format!("{tag}:err"),
            };
            log.lock().push(label);
        })
    }

    #[test]
    fn test_only_first_request_fetches() {
        let table = BundleTable::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        assert!(matches!(table.request("a.js", recorder(&log, "1")), Admission::Fetch));
        assert!(matches!(table.request("a.js", recorder(&log, "2")), Admission::Queued));
        assert!(matches!(table.request("a.js", recorder(&log, "3")), Admission::Queued));
        assert_eq!(table.status("a.js"), BundleStatus::Loading { waiters: 3 });

        let waiters = table.finish("a.js", &Ok(()));
        assert_eq!(waiters.len(), 3);
        assert_eq!(table.status("a.js"), BundleStatus::Loaded);

        let loader = crate::loader::ModuleLoader::default();
        for callback in waiters {
            callback(Ok(loader.require_fn()));
        }
        assert_eq!(*log.lock(), vec!["1:ok", "2:ok", "3:ok"]);
        assert!(matches!(table.request("a.js", recorder(&log, "4")), Admission::Ready(_)));
    }

    #[test]
    fn test_failure_is_terminal() {
        let table = BundleTable::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let err = BundleError {
            path: "b.js".into(),
            reason: "404".into(),
        };

        table.request("b.js", recorder(&log, "1"));
        let waiters = table.finish("b.js", &Err(err.clone()));
        assert_eq!(waiters.len(), 1);
        assert_eq!(table.status("b.js"), BundleStatus::Failed(err.clone()));

        // A late success report does not resurrect the path
        assert!(table.finish("b.js", &Ok(())).is_empty());
        match table.request("b.js", recorder(&log, "2")) {
            Admission::Failed(_, replayed) => assert_eq!(replayed, err),
            other => panic!("unexpected admission: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_path_is_absent() {
        let table = BundleTable::new();
        assert_eq!(table.status("nope.js"), BundleStatus::Absent);
        assert!(table.loaded_paths().is_empty());
    }
}
