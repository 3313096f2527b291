// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Asset Pipeline
//!
//! The built-in alternative to an external asset process. It does two
//! things in the asset build directory (`.tmp/dist` by default):
//!
//! - **Bundling**: starting from the entry module, follows relative
//!   imports and concatenates every module once, dependencies first.
//! - **Vendor copy**: copies each file or directory of the vendor manifest
//!   byte for byte.
//!
//! Recognised imports start on their own line; a named import list may
//! span several lines:
//!
//! ```text
//! import { helper } from './lib/helper';
//! import {
//!   first,
//!   second,
//! } from './lib/pair';
//! import './polyfills.js';
//! require('./legacy');
//! ```
//!
//! Import statements are removed from the bundle; specifiers resolve to the
//! file itself, then `<specifier>.js`, then `<specifier>/index.js`.
//! Imports that do not start with `./` or `../` are left untouched.

use crate::core::config::{Config, VendorAsset};
use crate::core::error::{BlogFlowError, Result};
use crate::process::{copy_dir_all, copy_file, normalize};
use log::{debug, info};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const IMPORT_PATTERN: &str = r#"(?m)^[ \t]*(?:import\s+(?:[\w*${}\s,]+?\s+from\s+)?|require\s*\(\s*)['"](\.{1,2}/[^'"]+)['"][ \t]*\)?[ \t]*;?[ \t]*(?:\r?\n|$)"#;

/// One module of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Path relative to the project root, with `/` separators.
    pub name: String,
    /// Source with its import statements removed.
    pub body: String,
}

/// Concatenated modules in dependency order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Modules, dependencies before dependents.
    pub modules: Vec<Module>,
}

impl Bundle {
    /// Renders the bundle, each module preceded by a path banner.
    pub fn to_source(&self) -> String {
        let mut source = String::new();
        for module in &self.modules {
            source.push_str(&format!("/* {} */\n", module.name));
            source.push_str(module.body.trim_end_matches('\n'));
            source.push('\n');
        }
        source
    }
}

/// Collects modules depth-first, emitting each after its imports.
#[derive(Debug)]
struct Collector {
    root: PathBuf,
    import: Regex,
    visiting: HashSet<PathBuf>,
    done: HashSet<PathBuf>,
    modules: Vec<Module>,
}

impl Collector {
    fn visit(&mut self, path: PathBuf) -> Result<()> {
        if self.done.contains(&path) || !self.visiting.insert(path.clone()) {
            return Ok(());
        }

        let source = fs::read_to_string(&path).map_err(|e| {
            BlogFlowError::asset_error(
                format!("Failed to read module: {}", e),
                path.clone(),
            )
        })?;
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();

        let imports: Vec<String> = self
            .import
            .captures_iter(&source)
            .map(|captures| captures[1].to_string())
            .collect();
        let body = self.import.replace_all(&source, "").into_owned();

        for specifier in imports {
            let dependency = resolve_import(&dir, &specifier).ok_or_else(|| {
                BlogFlowError::asset_error(
                    format!(
                        "Cannot resolve `{}` imported from {}",
                        specifier,
                        path.display()
                    ),
                    normalize(&dir.join(&specifier)),
                )
            })?;
            self.visit(dependency)?;
        }

        _ = self.visiting.remove(&path);
        _ = self.done.insert(path.clone());
        let name = path
            .strip_prefix(&self.root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        debug!("Bundled {}", name);
        self.modules.push(Module { name, body });
        Ok(())
    }
}

fn resolve_import(dir: &Path, specifier: &str) -> Option<PathBuf> {
    let base = normalize(&dir.join(specifier));
    let mut with_js = base.clone().into_os_string();
    with_js.push(".js");

    [base.clone(), PathBuf::from(with_js), base.join("index.js")]
        .into_iter()
        .find(|candidate| candidate.is_file())
}

/// Bundles the module graph reachable from `entry`.
///
/// Module names in the output are relative to `root`.
pub fn bundle_modules(root: &Path, entry: &Path) -> Result<Bundle> {
    let entry = normalize(entry);
    if !entry.is_file() {
        return Err(BlogFlowError::asset_error(
            "Entry module not found",
            entry,
        ));
    }

    let import = Regex::new(IMPORT_PATTERN)
        .map_err(|e| BlogFlowError::internal_error(e.to_string()))?;
    let mut collector = Collector {
        root: normalize(root),
        import,
        visiting: HashSet::new(),
        done: HashSet::new(),
        modules: Vec::new(),
    };
    collector.visit(entry)?;

    Ok(Bundle {
        modules: collector.modules,
    })
}

/// Copies one vendor manifest entry; returns the number of files copied.
pub fn copy_vendor(
    root: &Path,
    build_dir: &Path,
    asset: &VendorAsset,
) -> Result<usize> {
    let source = normalize(&root.join(&asset.source));
    let destination = build_dir.join(&asset.destination);

    if source.is_dir() {
        copy_dir_all(&source, &destination)
    } else if source.is_file() {
        _ = copy_file(&source, &destination)?;
        Ok(1)
    } else {
        Err(BlogFlowError::asset_error(
            "Vendor source not found",
            source,
        ))
    }
}

/// What the built-in asset pipeline produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    /// Bundle written, relative to the build directory.
    pub bundle: Option<PathBuf>,
    /// Number of modules in the bundle.
    pub modules: usize,
    /// Number of vendor files copied.
    pub vendor_files: usize,
}

/// The built-in asset pipeline.
#[derive(Debug, Clone)]
pub struct AssetBundler {
    root: PathBuf,
    build_dir: PathBuf,
    entry: Option<PathBuf>,
    destination: PathBuf,
    vendor: Vec<VendorAsset>,
}

impl AssetBundler {
    /// Creates the pipeline from the asset settings.
    pub fn from_config(config: &Config) -> Self {
        Self {
            root: config.root.clone(),
            build_dir: config.resolve(&config.assets.build_dir),
            entry: config.assets.entry.as_ref().map(|e| config.resolve(e)),
            destination: config.assets.destination.clone(),
            vendor: config.assets.vendor.clone(),
        }
    }

    /// Directory the pipeline writes into.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Rebuilds the asset directory from scratch.
    pub fn run(&self) -> Result<AssetReport> {
        if self.build_dir.exists() {
            fs::remove_dir_all(&self.build_dir).map_err(|e| {
                BlogFlowError::io_error(self.build_dir.clone(), e)
            })?;
        }
        fs::create_dir_all(&self.build_dir)
            .map_err(|e| BlogFlowError::io_error(self.build_dir.clone(), e))?;

        let mut report = AssetReport::default();

        if let Some(entry) = &self.entry {
            let bundle = bundle_modules(&self.root, entry)?;
            let target = self.build_dir.join(&self.destination);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    BlogFlowError::io_error(parent.to_path_buf(), e)
                })?;
            }
            fs::write(&target, bundle.to_source())
                .map_err(|e| BlogFlowError::io_error(target.clone(), e))?;
            info!(
                "Bundled {} module(s) into {}",
                bundle.modules.len(),
                target.display()
            );
            report.modules = bundle.modules.len();
            report.bundle = Some(self.destination.clone());
        }

        for asset in &self.vendor {
            report.vendor_files +=
                copy_vendor(&self.root, &self.build_dir, asset)?;
        }
        if report.vendor_files > 0 {
            info!("Copied {} vendor file(s)", report.vendor_files);
        }

        Ok(report)
    }
}
