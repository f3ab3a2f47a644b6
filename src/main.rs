// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spacey-bundle - command line front end for the Spacey module loader
//!
//! Loads JSON bundle manifests from a directory, then resolves and
//! instantiates modules out of them.
//!
//! ## Examples
//!
//! ```bash
//! spacey-bundle --root dist load vendor.json app.json -r 'app@^1.0.0/main.js'
//! spacey-bundle --root dist resolve vendor.json --request '@acme/util@~1.4.0/index.js'
//! spacey-bundle --root dist list vendor.json app.json --json
//! ```

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use owo_colors::OwoColorize;
use spacey_loader::{FsBundleFetcher, LoaderConfig, ModuleLoader, Require};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let default_level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(&cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Config file and environment first, command line flags on top
fn load_config(cli: &Cli) -> anyhow::Result<LoaderConfig> {
    let mut config = LoaderConfig::load(cli.config.as_deref())?;
    if let Some(root) = &cli.root {
        config.root = Some(root.clone());
    }
    if cli.strict {
        config.single_candidate_shortcut = false;
    }
    Ok(config)
}

async fn run(cli: &Cli, config: LoaderConfig) -> anyhow::Result<()> {
    let fetcher = FsBundleFetcher::new(config.root_dir());
    let loader = ModuleLoader::with_config(config, fetcher);

    match &cli.command {
        Commands::Load(args) => {
            let require = load_bundles(&loader, &args.bundles).await?;
            for request in &args.requests {
                let exports = require.require(request)?;
                let id = require.resolve(request)?;
                println!("{}", id.bright_cyan().bold());
                println!("{}", serde_json::to_string_pretty(&exports.to_json())?);
            }
        }
        Commands::Resolve(args) => {
            let require = load_bundles(&loader, &args.bundles).await?;
            let id = require.resolve(&args.request)?;
            println!("{} {} {}", args.request.dimmed(), "->".dimmed(), id.green());
        }
        Commands::List(args) => {
            load_bundles(&loader, &args.bundles).await?;
            let ids = loader.registered_ids();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                for id in &ids {
                    println!("  {}", id);
                }
                println!();
                println!(
                    "{} modules from {} bundles",
                    ids.len().to_string().yellow(),
                    loader.loaded_bundles().len().to_string().yellow()
                );
            }
        }
    }

    tracing::debug!("{}", loader.stats().summary());
    Ok(())
}

/// Wait for every bundle, bounded by the configured timeout
async fn load_bundles(loader: &ModuleLoader, bundles: &[String]) -> anyhow::Result<Require> {
    let require = match loader.config().timeout() {
        Some(limit) => tokio::time::timeout(limit, loader.require_bundles(bundles))
            .await
            .with_context(|| format!("bundles did not load within {:?}", limit))??,
        None => loader.require_bundles(bundles).await?,
    };
    Ok(require)
}
