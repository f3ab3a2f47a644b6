// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-loader
//!
//! A runtime module loader for independently built code bundles.
//!
//! Bundles register modules under version-mangled identifiers
//! (`<package>@<version>[/<path>]`, packages may be scoped). Other code asks
//! for modules with semver constraints and gets the highest registered
//! version that satisfies them. Bundles are fetched lazily; concurrent
//! requests for the same bundle share a single fetch.
//!
//! - `define()` registers a module factory (first definition wins)
//! - `require()` resolves a request and instantiates the module once
//! - `require_bundles()` loads a set of bundles and yields `require`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spacey_loader::{FsBundleFetcher, ModuleLoader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let loader = ModuleLoader::new(FsBundleFetcher::new("dist"));
//!     let require = loader.require_bundles(["vendor.json", "app.json"]).await?;
//!     let exports = require.require("@acme/widgets@^2.1.0/index.js")?;
//!     println!("{}", exports.to_json());
//!     Ok(())
//! }
//! ```
//!
//! ## Defining modules directly
//!
//! ```rust,ignore
//! let loader = ModuleLoader::default();
//! loader.define("greeter@1.4.0/index.js", |_module, exports, _require| {
//!     exports.set("greeting", "hello");
//!     Ok(())
//! });
//! let greeter = loader.require("greeter@^1.0.0/index.js")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
pub mod cache;
pub mod config;
pub mod error;
pub mod exports;
pub mod fetcher;
pub mod loader;
pub mod name;
pub mod range;
pub mod registry;
pub mod resolver;
pub mod stats;

// Re-exports
pub use bundle::{BundleCallback, BundleStatus};
pub use config::LoaderConfig;
pub use error::{BundleError, LoaderError, ResolveError, Result};
pub use exports::{ExportValue, Exports, ModuleRecord};
pub use fetcher::{BundleFetcher, BundleManifest, FsBundleFetcher, ModuleManifest, NullFetcher};
pub use loader::{ModuleLoader, Require};
pub use name::ParsedName;
pub use range::VersionRange;
pub use registry::{factory, Factory};
pub use stats::LoaderStats;

/// Version of the spacey-loader crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
