// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line interface for BlogFlow
//!
//! This module defines the `blogflow` command, turns parsed arguments into
//! an [`Invocation`] and runs it against the library.
//!
//! # Examples
//!
//! Parsing a `build` command with an output override:
//!
//! ```
//! use blogflow::cli::{self, Action, Invocation};
//!
//! let matches = cli::build().get_matches_from(vec![
//!     "blogflow",
//!     "build",
//!     "--output",
//!     "public",
//!     "--minify",
//! ]);
//!
//! let invocation = Invocation::from_matches(&matches).unwrap();
//! assert_eq!(invocation.action, Action::Build);
//! assert!(invocation.minify);
//! ```

use crate::assets::AssetBundler;
use crate::core::config::{ConfigBuilder, Profile, DEFAULT_CONFIG_FILE};
use crate::core::error::{BlogFlowError, Result};
use crate::{BlogFlow, Config, Route};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, info, LevelFilter};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

/// The current version of BlogFlow, as defined in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "BLOGFLOW_";

/// Placeholder printed by `routes` for documents without a layout.
const NO_LAYOUT: &str = "(none)";

/// The subcommand being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Render the site and publish it.
    Build,
    /// Run the built-in asset bundler only.
    Assets,
    /// Print every route with its layout.
    Routes,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The subcommand.
    pub action: Action,
    /// Configuration file.
    pub config: PathBuf,
    /// Output directory override (`build` only).
    pub output: Option<PathBuf>,
    /// Forces HTML minification (`build` only).
    pub minify: bool,
    /// Profile override (`build` only).
    pub profile: Option<String>,
    /// Uses the built-in bundler even when an external pipeline is
    /// configured (`build` only).
    pub no_external: bool,
    /// Number of `-v` flags.
    pub verbosity: u8,
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help("Configuration file")
        .value_parser(value_parser!(PathBuf))
        .default_value(DEFAULT_CONFIG_FILE)
}

/// Builds and configures the BlogFlow command-line interface.
pub fn build() -> Command {
    debug!("Building CLI command structure");

    Command::new("blogflow")
        .author("BlogFlow Contributors")
        .about("Builds a Markdown blog into a static site.")
        .version(VERSION)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Raise log verbosity (-v, -vv)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("build")
                .about("Build the site")
                .arg(config_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output directory")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("minify")
                        .short('m')
                        .long("minify")
                        .help("Minify HTML output")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("profile")
                        .short('p')
                        .long("profile")
                        .help("Configuration profile (development, staging, production)")
                        .value_parser(value_parser!(String)),
                )
                .arg(
                    Arg::new("no-external")
                        .long("no-external")
                        .help("Use the built-in asset bundler instead of the external pipeline")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("assets")
                .about("Bundle JavaScript and copy vendor files")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("routes")
                .about("List every route and its layout")
                .arg(config_arg()),
        )
        .after_help(
            "\x1b[1;4mLicense:\x1b[0m\n  The project is licensed under the terms of \
             both the MIT license and the Apache License (Version 2.0).",
        )
}

impl Invocation {
    /// Extracts an invocation from parsed arguments.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let (action, sub) = match matches.subcommand() {
            Some(("build", sub)) => (Action::Build, sub),
            Some(("assets", sub)) => (Action::Assets, sub),
            Some(("routes", sub)) => (Action::Routes, sub),
            _ => return Err(BlogFlowError::internal_error("Unknown command")),
        };

        let config = sub
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let is_build = action == Action::Build;

        Ok(Self {
            action,
            config,
            output: if is_build {
                sub.get_one::<PathBuf>("output").cloned()
            } else {
                None
            },
            minify: is_build && sub.get_flag("minify"),
            profile: if is_build {
                sub.get_one::<String>("profile").cloned()
            } else {
                None
            },
            no_external: is_build && sub.get_flag("no-external"),
            verbosity: sub.get_count("verbose"),
        })
    }

    /// Log level selected by the `-v` flags.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Configuration builder with the file, environment and command-line
    /// overrides applied in that order.
    pub fn config_builder(&self) -> Result<ConfigBuilder> {
        let mut builder = ConfigBuilder::new()
            .with_file(&self.config)
            .with_env_prefix(ENV_PREFIX);

        if let Some(output) = &self.output {
            // Relative to the working directory, not the project root.
            let output = if output.is_absolute() {
                output.clone()
            } else {
                env::current_dir()?.join(output)
            };
            builder =
                builder.with_override("output_dir", output.display().to_string());
        }
        if self.minify {
            builder = builder.with_override("output.minify", true);
        }
        if let Some(profile) = &self.profile {
            builder = builder.with_profile(Profile::from_name(profile));
        }
        Ok(builder)
    }

    /// Loads the configuration this invocation describes.
    pub fn load_config(&self) -> Result<Config> {
        self.config_builder()?.build()
    }
}

/// Writes one `url  layout` line per route.
pub fn write_routes<W: Write>(out: &mut W, routes: &[Route]) -> io::Result<()> {
    let width = routes.iter().map(|r| r.url.len()).max().unwrap_or(0);
    for route in routes {
        writeln!(
            out,
            "{:<width$}  {}",
            route.url,
            route.layout.as_deref().unwrap_or(NO_LAYOUT),
            width = width
        )?;
    }
    Ok(())
}

/// Runs an invocation to completion.
pub fn execute(invocation: &Invocation) -> Result<()> {
    let config = invocation.load_config()?;
    debug!("Loaded configuration from {}", invocation.config.display());

    match invocation.action {
        Action::Build => {
            let report = BlogFlow::from_config(config)?
                .with_external_pipeline(!invocation.no_external)
                .build()?;
            info!("Site written to {}", report.output.display());
            Ok(())
        }
        Action::Assets => {
            let report = AssetBundler::from_config(&config).run()?;
            info!("Asset pipeline finished: {:?}", report);
            Ok(())
        }
        Action::Routes => {
            let routes = BlogFlow::from_config(config)?.routes()?;
            let stdout = io::stdout();
            write_routes(&mut stdout.lock(), &routes)?;
            Ok(())
        }
    }
}
