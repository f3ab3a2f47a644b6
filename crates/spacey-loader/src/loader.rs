// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - define, require, and on-demand bundle loading

use crate::bundle::{Admission, BundleCallback, BundleStatus, BundleTable};
use crate::cache::{InstanceCache, Reservation};
use crate::config::LoaderConfig;
use crate::error::{BundleError, LoaderError, ResolveError, Result};
use crate::exports::{Exports, ModuleRecord};
use crate::fetcher::{BundleFetcher, NullFetcher};
use crate::registry::{Factory, ModuleRegistry};
use crate::resolver::Resolver;
use crate::stats::LoaderStats;
use futures::future::join_all;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

/// Everything one loader instance owns
struct LoaderContext {
    config: LoaderConfig,
    registry: ModuleRegistry,
    resolver: Resolver,
    instances: InstanceCache,
    bundles: BundleTable,
    fetcher: Arc<dyn BundleFetcher>,
    stats: LoaderStats,
}

/// Module loader.
///
/// Cheap to clone; clones share the same registry, caches, and bundle state.
/// Independent loaders never see each other's modules.
#[derive(Clone)]
pub struct ModuleLoader {
    ctx: Arc<LoaderContext>,
}

impl ModuleLoader {
    /// Create a loader that fetches bundles with `fetcher`
    pub fn new(fetcher: impl BundleFetcher + 'static) -> Self {
        Self::with_config(LoaderConfig::default(), fetcher)
    }

    /// Create a loader with explicit configuration
    pub fn with_config(config: LoaderConfig, fetcher: impl BundleFetcher + 'static) -> Self {
        let resolver = Resolver::new(config.single_candidate_shortcut);
        Self {
            ctx: Arc::new(LoaderContext {
                config,
                registry: ModuleRegistry::new(),
                resolver,
                instances: InstanceCache::new(),
                bundles: BundleTable::new(),
                fetcher: Arc::new(fetcher),
                stats: LoaderStats::new(),
            }),
        }
    }

    /// Register a module factory under an exact identifier.
    ///
    /// The first definition of an identifier wins; later ones are ignored.
    /// Returns `true` if this call registered the factory.
    pub fn define<F>(&self, id: &str, factory: F) -> bool
    where
        F: Fn(&ModuleRecord, &Exports, &Require) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.define_factory(id, Arc::new(factory))
    }

    /// Register an already boxed factory
    pub fn define_factory(&self, id: &str, factory: Factory) -> bool {
        if self.ctx.resolver.names().parse(id).is_none() {
            warn!("Defining {} which is not a valid module identifier", id);
        }
        self.ctx.registry.define(id, factory)
    }

    /// Resolve a request to the exact identifier `require` would load
    pub fn resolve(&self, request: &str) -> Result<String> {
        Ok(self.ctx.resolver.resolve(request, &self.ctx.registry)?)
    }

    /// Load a module, running its factory on first use.
    ///
    /// The module's record is installed before the factory runs, so a factory
    /// that (directly or through a cycle) requires itself gets the partially
    /// populated exports instead of recursing. Factory errors are returned as
    /// they are; the half-initialized record stays cached.
    pub fn require(&self, request: &str) -> Result<Exports> {
        let id = self.resolve(request)?;

        if let Some(record) = self.ctx.instances.get(&id) {
            self.ctx.stats.inc_instance_hit();
            return Ok(record.exports().clone());
        }

        let factory = self
            .ctx
            .registry
            .get(&id)
            .ok_or_else(|| ResolveError::not_found(request))?;

        let record = match self.ctx.instances.reserve(&id) {
            Reservation::Existing(record) => {
                self.ctx.stats.inc_instance_hit();
                return Ok(record.exports().clone());
            }
            Reservation::Reserved(record) => record,
        };

        debug!("Instantiating {}", id);
        self.ctx.stats.inc_factory();
        factory(&record, record.exports(), &self.require_fn()).map_err(LoaderError::Factory)?;
        self.ctx.instances.populate(&record);

        Ok(record.exports().clone())
    }

    /// A `require` capability bound to this loader
    pub fn require_fn(&self) -> Require {
        Require {
            loader: self.clone(),
        }
    }

    /// Invoke `on_ready` once the bundle at `path` is available.
    ///
    /// Only the first request for a path starts a fetch; requests arriving
    /// while it is in flight are queued and woken in order. Requests for a
    /// loaded (or failed) bundle are answered immediately. Fetches run on the
    /// current tokio runtime.
    pub fn ensure_bundle<F>(&self, path: &str, on_ready: F)
    where
        F: FnOnce(std::result::Result<Require, BundleError>) + Send + 'static,
    {
        match self.ctx.bundles.request(path, Box::new(on_ready)) {
            Admission::Fetch => self.spawn_fetch(path),
            Admission::Queued => debug!("Bundle {} already loading; queued", path),
            Admission::Ready(callback) => callback(Ok(self.require_fn())),
            Admission::Failed(callback, err) => callback(Err(err)),
        }
    }

    /// Load every bundle in `paths` and hand back `require` once all are ready.
    ///
    /// Fails with the first failing bundle's error; a partial set is never
    /// reported as ready.
    #[instrument(skip_all)]
    pub async fn require_bundles<I>(&self, paths: I) -> Result<Require>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let pending: Vec<_> = paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref().to_string();
                let (tx, rx) = oneshot::channel();
                self.ensure_bundle(&path, move |outcome| {
                    let _ = tx.send(outcome);
                });
                (path, rx)
            })
            .collect();

        debug!("Waiting on {} bundles", pending.len());

        let outcomes = join_all(pending.into_iter().map(|(path, rx)| async move {
            match rx.await {
                Ok(outcome) => outcome.map(|_| ()).map_err(LoaderError::from),
                Err(_) => Err(LoaderError::Abandoned(path)),
            }
        }))
        .await;

        for outcome in outcomes {
            outcome?;
        }

        Ok(self.require_fn())
    }

    fn spawn_fetch(&self, path: &str) {
        let path = path.to_string();
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let err = BundleError {
                    path: path.clone(),
                    reason: format!("no async runtime to fetch on: {}", e),
                };
                self.settle(&path, Err(err));
                return;
            }
        };

        let loader = self.clone();
        handle.spawn(async move {
            let outcome = loader.run_fetch(&path).await;
            loader.settle(&path, outcome);
        });
    }

    async fn run_fetch(&self, path: &str) -> std::result::Result<(), BundleError> {
        self.ctx.stats.inc_fetch();
        info!("Fetching bundle {}", path);

        let fetch = self.ctx.fetcher.fetch(path, self);
        match AssertUnwindSafe(fetch).catch_unwind().await {
            Ok(Ok(())) => {
                info!("Bundle {} loaded", path);
                Ok(())
            }
            Ok(Err(e)) => Err(BundleError::from_fetch(path, &e)),
            Err(_) => Err(BundleError {
                path: path.to_string(),
                reason: "fetcher panicked".to_string(),
            }),
        }
    }

    /// Record the outcome and wake every waiter in registration order
    fn settle(&self, path: &str, outcome: std::result::Result<(), BundleError>) {
        if let Err(err) = &outcome {
            self.ctx.stats.inc_fetch_failed();
            warn!("{}", err);
        }

        let waiters: Vec<BundleCallback> = self.ctx.bundles.finish(path, &outcome);
        for callback in waiters {
            match &outcome {
                Ok(()) => callback(Ok(self.require_fn())),
                Err(err) => callback(Err(err.clone())),
            }
        }
    }

    /// Load state of a bundle path
    pub fn bundle_status(&self, path: &str) -> BundleStatus {
        self.ctx.bundles.status(path)
    }

    /// Bundle paths that finished loading
    pub fn loaded_bundles(&self) -> Vec<String> {
        self.ctx.bundles.loaded_paths()
    }

    /// Check if an exact identifier has a factory
    pub fn is_defined(&self, id: &str) -> bool {
        self.ctx.registry.contains(id)
    }

    /// All registered identifiers, sorted
    pub fn registered_ids(&self) -> Vec<String> {
        let mut ids = self.ctx.registry.ids();
        ids.sort();
        ids
    }

    /// Identifiers that have been (or are being) instantiated, sorted
    pub fn instantiated_ids(&self) -> Vec<String> {
        let mut ids = self.ctx.instances.keys();
        ids.sort();
        ids
    }

    /// The record of an instantiated module
    pub fn record(&self, id: &str) -> Option<Arc<ModuleRecord>> {
        self.ctx.instances.get(id)
    }

    /// Loader counters
    pub fn stats(&self) -> &LoaderStats {
        &self.ctx.stats
    }

    /// Configuration this loader was built with
    pub fn config(&self) -> &LoaderConfig {
        &self.ctx.config
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new(NullFetcher)
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("modules", &self.ctx.registry.len())
            .field("instances", &self.ctx.instances.len())
            .finish()
    }
}

/// The `require` capability handed to factories and bundle waiters
#[derive(Clone, Debug)]
pub struct Require {
    loader: ModuleLoader,
}

impl Require {
    /// Load a module by (possibly version-constrained) identifier
    pub fn require(&self, request: &str) -> Result<Exports> {
        self.loader.require(request)
    }

    /// Resolve a request without instantiating it
    pub fn resolve(&self, request: &str) -> Result<String> {
        self.loader.resolve(request)
    }

    /// The loader behind this capability
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }
}
