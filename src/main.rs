// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! lodestar - a dynamic module-loading runtime
//!
//! This is the main entry point for the lodestar CLI.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, ResolveArgs, RunArgs};
use lodestar_core::module_system::{IdentifierResolver, Origin, parse_id};
use lodestar_core::{FsLoader, Runtime, RuntimeConfig, UnitManifest};
use owo_colors::OwoColorize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over the -v default
    let default_filter = if cli.verbose {
        "lodestar=debug,lodestar_core=debug"
    } else {
        "lodestar=warn,lodestar_core=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok(), default_filter))
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Run(args) => run(&cli, args).await,
        Commands::Resolve(args) => resolve(&cli, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Log filter from `RUST_LOG`, falling back to `default` when it is unset,
/// empty or does not parse
fn log_filter(rust_log: Option<String>, default: &str) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// Build the runtime configuration: file (or defaults plus environment),
/// then command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<RuntimeConfig> {
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            let mut config = RuntimeConfig::default();
            config.load_from_env();
            config
        }
    };

    if let Some(root) = &cli.root {
        config.root_dir = root.clone();
    }
    if let Some(ext) = &cli.ext {
        config.extension = ext.clone();
    }
    if cli.no_cache {
        config.debug.disable_caching = true;
    }
    if cli.warn_undeclared {
        config.debug.warn_undeclared = true;
    }

    debug!(?config, "configuration");
    Ok(config)
}

async fn run(cli: &Cli, args: &RunArgs) -> anyhow::Result<()> {
    let config = build_config(cli)?;
    let source = tokio::fs::read_to_string(&args.main_file)
        .await
        .with_context(|| format!("reading {}", args.main_file.display()))?;
    let manifest = UnitManifest::parse(&source)
        .with_context(|| format!("parsing {}", args.main_file.display()))?;

    let runtime = Runtime::new(config, Arc::new(FsLoader::new(&cli.dir)));
    manifest.declare(&runtime.module())?;
    let main = runtime.run_main().await?;

    println!("{}", serde_json::to_string_pretty(&main.to_json())?);

    if args.list {
        println!();
        println!("{}", "MODULES:".white().bold());
        for id in runtime.list_modules() {
            println!("    {}", id.display_name().cyan());
        }
    }

    Ok(())
}

fn resolve(cli: &Cli, args: &ResolveArgs) -> anyhow::Result<()> {
    let config = build_config(cli)?;
    let resolver = IdentifierResolver::new(config.root_dir.clone());
    let origin = match &args.from {
        Some(from) => Origin::Module(parse_id(from)?),
        None => Origin::Module(lodestar_core::ModuleId::main()),
    };

    let id = resolver.resolve(&args.identifier, &origin)?;
    println!("{:10} {}", "id".white().bold(), id.display_name().green());
    println!(
        "{:10} {}",
        "locator".white().bold(),
        id.locator(&config.extension).to_string().green()
    );
    Ok(())
}
