// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI argument parsing for lodestar.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// lodestar - run and inspect module graphs built from JSON unit manifests
#[derive(Parser, Debug)]
#[command(name = "lodestar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory unit locators are read from
    #[arg(long, global = true, env = "LODESTAR_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Application root directory bare identifiers resolve against
    #[arg(long, global = true)]
    pub root: Option<String>,

    /// Locator suffix appended to module ids
    #[arg(long, global = true)]
    pub ext: Option<String>,

    /// JSON configuration file
    #[arg(long, global = true, env = "LODESTAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ask the loader to bypass its source cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Warn when a unit requires something it never declared
    #[arg(long, global = true)]
    pub warn_undeclared: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Declare a main unit from a manifest, provide its dependencies and run it
    Run(RunArgs),

    /// Resolve an identifier to its canonical id and locator
    Resolve(ResolveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Manifest of the main unit
    #[arg(value_name = "MAIN_FILE")]
    pub main_file: PathBuf,

    /// Also list every known module id
    #[arg(short, long)]
    pub list: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Identifier to resolve
    #[arg(value_name = "IDENTIFIER")]
    pub identifier: String,

    /// Canonical id of the requesting unit (default: the main unit)
    #[arg(long, value_name = "ID")]
    pub from: Option<String>,
}
