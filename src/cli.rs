// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI argument parsing for spacey-bundle.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// spacey-bundle - load versioned module bundles and inspect what they define
#[derive(Parser, Debug)]
#[command(name = "spacey-bundle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory bundles are read from
    #[arg(long, global = true, env = "SPACEY_LOADER_ROOT")]
    pub root: Option<PathBuf>,

    /// Loader config file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Require the chosen version to satisfy the constraint even when only one exists
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load bundles and print the exports of the requested modules
    Load(LoadArgs),

    /// Load bundles and print which module a request resolves to
    Resolve(ResolveArgs),

    /// Load bundles and list every module they define
    #[command(alias = "ls")]
    List(ListArgs),
}

/// Arguments for `load`
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Bundle paths, relative to the root
    #[arg(required = true)]
    pub bundles: Vec<String>,

    /// Module requests to instantiate, e.g. `@scope/pkg@^1.0.0/index.js`
    #[arg(short = 'r', long = "require", required = true)]
    pub requests: Vec<String>,
}

/// Arguments for `resolve`
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Bundle paths, relative to the root
    #[arg(required = true)]
    pub bundles: Vec<String>,

    /// Module request to resolve
    #[arg(long)]
    pub request: String,
}

/// Arguments for `list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Bundle paths, relative to the root
    #[arg(required = true)]
    pub bundles: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
