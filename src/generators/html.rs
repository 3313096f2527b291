// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # HTML Output Generation
//!
//! Writes rendered documents below the staging directory. HTML documents
//! can be minified with `minify-html`; every other format is written
//! exactly as rendered.
//!
//! # Examples
//!
//! ```rust,no_run
//! use blogflow::generators::html::HtmlGenerator;
//! use blogflow::OutputGenerator;
//! use std::path::PathBuf;
//!
//! let generator = HtmlGenerator::new().with_minification(true);
//!
//! generator.generate(
//!     "<html><body>Hello World</body></html>",
//!     &PathBuf::from("build/index.html"),
//!     None
//! ).unwrap();
//! ```

use crate::{BlogFlowError, OutputGenerator, Result};
use log::debug;
use minify_html::{minify, Cfg};
use serde_json::Value as JsonValue;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output generator for rendered documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlGenerator {
    minify: bool,
}

impl HtmlGenerator {
    /// Creates a new HtmlGenerator with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables HTML minification.
    pub fn with_minification(mut self, enable: bool) -> Self {
        self.minify = enable;
        self
    }

    /// Minifies HTML content using the `minify-html` crate.
    fn minify_html(&self, content: &str, path: &Path) -> Result<String> {
        let cfg = Cfg {
            minify_css: true,
            minify_js: true,
            ..Cfg::default()
        };
        String::from_utf8(minify(content.as_bytes(), &cfg)).map_err(|e| {
            BlogFlowError::output_generation_error(
                "HTML minification failed",
                path.to_path_buf(),
                Some(Box::new(e)),
            )
        })
    }

    fn should_minify(&self, path: &Path, options: Option<&JsonValue>) -> bool {
        let enabled = options
            .and_then(|opts| opts.get("minify"))
            .and_then(JsonValue::as_bool)
            .unwrap_or(self.minify);
        enabled
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
    }
}

impl OutputGenerator for HtmlGenerator {
    fn generate(
        &self,
        content: &str,
        path: &Path,
        options: Option<&JsonValue>,
    ) -> Result<()> {
        self.validate(path, options)?;

        let processed = if self.should_minify(path, options) {
            self.minify_html(content, path)?
        } else {
            content.to_string()
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BlogFlowError::io_error(parent.to_path_buf(), e))?;
        }
        let file = File::create(path)
            .map_err(|e| BlogFlowError::io_error(path.to_path_buf(), e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(processed.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| BlogFlowError::io_error(path.to_path_buf(), e))?;

        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn validate(
        &self,
        path: &Path,
        options: Option<&JsonValue>,
    ) -> Result<()> {
        if path.file_name().is_none() {
            return Err(BlogFlowError::output_generation_error(
                "Output path has no file name",
                path.to_path_buf(),
                None,
            ));
        }
        if path.is_dir() {
            return Err(BlogFlowError::output_generation_error(
                "Output path is a directory",
                path.to_path_buf(),
                None,
            ));
        }
        if let Some(opts) = options {
            let Some(obj) = opts.as_object() else {
                return Err(BlogFlowError::output_generation_error(
                    "Invalid options format - expected JSON object",
                    path.to_path_buf(),
                    None,
                ));
            };
            for (key, value) in obj {
                match key.as_str() {
                    "minify" if !value.is_boolean() => {
                        return Err(BlogFlowError::output_generation_error(
                            "minify option must be a boolean",
                            path.to_path_buf(),
                            None,
                        ));
                    }
                    "minify" => {}
                    _ => log::warn!("Unknown option key: {}", key),
                }
            }
        }
        Ok(())
    }
}
