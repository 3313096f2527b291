// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # BlogFlow CLI
//!
//! This is the main entry point for the BlogFlow command-line interface.
//! It parses the command line, initialises the logger and runs the
//! requested command.

use anyhow::Context;
use blogflow::cli::{self, Action, Invocation};
use log::info;

/// Runs a parsed invocation, attaching a description of the failed step.
fn run(invocation: &Invocation) -> Result<(), anyhow::Error> {
    info!("Starting BlogFlow v{}", cli::VERSION);

    let step = match invocation.action {
        Action::Build => "Failed to build the site",
        Action::Assets => "Failed to run the asset pipeline",
        Action::Routes => "Failed to list routes",
    };
    cli::execute(invocation).with_context(|| {
        format!("{} ({})", step, invocation.config.display())
    })?;

    info!("BlogFlow completed successfully");
    Ok(())
}

/// The main entry point for the BlogFlow CLI.
fn main() {
    let matches = cli::build().get_matches();

    let result = Invocation::from_matches(&matches)
        .context("Failed to read the command line")
        .and_then(|invocation| {
            // RUST_LOG, when set, takes precedence over the -v flags.
            env_logger::Builder::new()
                .filter_level(invocation.log_level())
                .parse_default_env()
                .init();
            run(&invocation)
        });

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
