// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bundle fetchers
//!
//! A fetcher makes a bundle's code run. Running a bundle means calling
//! [`ModuleLoader::define`] for each module it carries; the loader takes care
//! of deduplicating fetches and waking everyone waiting on the bundle.

use crate::loader::ModuleLoader;
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Fetches a bundle and executes it against a loader.
///
/// Called at most once per bundle path per loader. Must return only after
/// every `define` the bundle performs has happened.
#[async_trait]
pub trait BundleFetcher: Send + Sync {
    /// Fetch and execute the bundle at `path`
    async fn fetch(&self, path: &str, loader: &ModuleLoader) -> anyhow::Result<()>;
}

/// Fetcher for loaders that only ever see modules defined directly
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFetcher;

#[async_trait]
impl BundleFetcher for NullFetcher {
    async fn fetch(&self, path: &str, _loader: &ModuleLoader) -> anyhow::Result<()> {
        bail!("no bundle fetcher configured (requested '{}')", path)
    }
}

/// On-disk bundle format: a list of declarative modules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Modules defined by this bundle
    #[serde(default)]
    pub modules: Vec<ModuleManifest>,
}

/// One module inside a [`BundleManifest`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Exact module identifier
    pub id: String,
    /// Exported values
    #[serde(default)]
    pub exports: BTreeMap<String, serde_json::Value>,
    /// Module requests instantiated before this module's exports are set
    #[serde(default)]
    pub requires: Vec<String>,
}

impl ModuleManifest {
    /// Define this module on `loader`
    pub fn define_on(&self, loader: &ModuleLoader) -> bool {
        let id = self.id.clone();
        let declared = self.exports.clone();
        let requires = self.requires.clone();

        loader.define(&self.id, move |_record, exports, require| {
            for request in &requires {
                require
                    .require(request)
                    .with_context(|| format!("{} depends on {}", id, request))?;
            }
            for (name, value) in &declared {
                exports.set(name.clone(), value.clone());
            }
            Ok(())
        })
    }
}

/// Reads JSON bundle manifests from a directory
#[derive(Debug, Clone)]
pub struct FsBundleFetcher {
    root: PathBuf,
}

impl FsBundleFetcher {
    /// Serve bundles from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory bundles are read from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a bundle path onto the root directory, refusing to escape it
    fn bundle_file(&self, path: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("bundle path '{}' leaves the bundle root", path),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BundleFetcher for FsBundleFetcher {
    async fn fetch(&self, path: &str, loader: &ModuleLoader) -> anyhow::Result<()> {
        let file = self.bundle_file(path)?;
        let content = tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        let manifest: BundleManifest = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", file.display()))?;

        let defined = manifest
            .modules
            .iter()
            .filter(|module| module.define_on(loader))
            .count();
        debug!(
            "Bundle {} defined {} of {} modules",
            path,
            defined,
            manifest.modules.len()
        );

        Ok(())
    }
}
