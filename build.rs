// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build script for BlogFlow.
//!
//! Refuses to build with a compiler older than the supported minimum.

/// Minimum supported Rust version, kept in sync with `rust-version`.
const MIN_RUSTC_VERSION: &str = "1.74.0";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    match version_check::is_min_version(MIN_RUSTC_VERSION) {
        Some(true) => {}
        Some(false) => {
            eprintln!(
                "BlogFlow requires rustc {} or newer.",
                MIN_RUSTC_VERSION
            );
            std::process::exit(1);
        }
        None => {
            println!(
                "cargo:warning=Unable to determine rustc version, assuming it is recent enough."
            );
        }
    }
}
