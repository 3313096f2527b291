// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Template Rendering Module
//!
//! Renders layouts, listing bodies and template pages with Handlebars.
//!
//! ## Features
//!
//! - Every `*.hbs` file below the template directory is registered, with
//!   subdirectories forming the name (`partials/nav.hbs` is `partials/nav`)
//! - Any registered template can be used as a partial
//! - Built-in `date` and `uppercase` helpers
//! - Rendering an unknown template is an error, never an empty page

use crate::{BlogFlowError, Result, TemplateRenderer};
use handlebars::{
    Context, Handlebars, Helper, Output, RenderContext, RenderError,
    RenderErrorReason,
};
use log::debug;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Template file extension.
const TEMPLATE_EXTENSION: &str = "hbs";

/// Represents a custom template helper with helper name and execution.
pub trait TemplateHelper: Send + Sync {
    /// Executes the helper with the given parameters and context.
    fn execute(
        &self,
        params: &[JsonValue],
        context: &JsonValue,
    ) -> Result<JsonValue>;

    /// Returns the name of the helper for registration.
    fn name(&self) -> &str;
}

/// Renderer for Handlebars templates with custom helpers.
#[derive(Clone)]
pub struct HandlebarsRenderer {
    engine: Arc<RwLock<Handlebars<'static>>>, // Handlebars engine
    template_dir: PathBuf,                    // Directory for templates
    strict_mode: bool,                        // Flag for strict mode
}

impl std::fmt::Debug for HandlebarsRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsRenderer")
            .field("template_dir", &self.template_dir)
            .field("strict_mode", &self.strict_mode)
            .finish()
    }
}

impl HandlebarsRenderer {
    /// Creates a renderer and registers every template below
    /// `template_dir`.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_dev_mode(cfg!(debug_assertions));
        handlebars.register_escape_fn(handlebars::html_escape);

        let renderer = Self {
            engine: Arc::new(RwLock::new(handlebars)),
            template_dir: template_dir.to_path_buf(),
            strict_mode: false,
        }
        .with_helper(helpers::UppercaseHelper)
        .with_helper(helpers::DateHelper);

        renderer.load_templates()?;
        Ok(renderer)
    }

    /// Enables or disables strict mode: missing variables become errors.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self.engine.write().set_strict_mode(strict);
        self
    }

    /// Registers a custom helper with the renderer.
    pub fn with_helper<H>(self, helper: H) -> Self
    where
        H: TemplateHelper + 'static,
    {
        let name = helper.name().to_string();
        self.register_helper(&name, helper);
        self
    }

    /// Whether a template called `name` is registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.engine.read().has_template(name)
    }

    /// Names of all registered templates, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.engine.read().get_templates().keys().cloned().collect();
        names.sort();
        names
    }

    /// Loads templates from the directory tree.
    fn load_templates(&self) -> Result<()> {
        let mut engine = self.engine.write();

        for entry in WalkDir::new(&self.template_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                BlogFlowError::template_rendering_error(
                    "Failed to read template directory",
                    self.template_dir.display().to_string(),
                    Some(Box::new(e)),
                )
            })?;
            let path = entry.path();

            let is_template = entry.file_type().is_file()
                && path.extension().and_then(|s| s.to_str())
                    == Some(TEMPLATE_EXTENSION)
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_template {
                continue;
            }

            let template_name = template_name(&self.template_dir, path)
                .ok_or_else(|| {
                    BlogFlowError::template_rendering_error(
                        "Invalid template filename",
                        path.display().to_string(),
                        None,
                    )
                })?;

            let template_content =
                std::fs::read_to_string(path).map_err(|e| {
                    BlogFlowError::template_rendering_error(
                        "Failed to read template file",
                        path.display().to_string(),
                        Some(Box::new(e)),
                    )
                })?;

            engine
                .register_template_string(&template_name, &template_content)
                .map_err(|e| {
                    BlogFlowError::template_rendering_error(
                        format!("Failed to register template: {}", e),
                        template_name.clone(),
                        Some(Box::new(e)),
                    )
                })?;
            debug!("Registered template {}", template_name);
        }
        Ok(())
    }

    /// Registers a helper function with the Handlebars engine.
    fn register_helper<H>(&self, name: &str, helper: H)
    where
        H: TemplateHelper + 'static,
    {
        let helper_fn = move |h: &Helper,
                              _: &Handlebars,
                              ctx: &Context,
                              _: &mut RenderContext,
                              out: &mut dyn Output|
              -> std::result::Result<
            (),
            RenderError,
        > {
            let params: Vec<JsonValue> =
                h.params().iter().map(|p| p.value().clone()).collect();

            let result =
                helper.execute(&params, ctx.data()).map_err(|e| {
                    RenderError::from(RenderErrorReason::Other(
                        e.to_string(),
                    ))
                })?;
            let text = match result {
                JsonValue::String(s) => s,
                other => other.to_string(),
            };
            out.write(&handlebars::html_escape(&text))?;
            Ok(())
        };

        self.engine
            .write()
            .register_helper(name, Box::new(helper_fn));
    }
}

/// Name of a template file relative to the template directory, without
/// its extension and with `/` separators.
fn template_name(template_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(template_dir).ok()?;
    let mut segments = relative
        .iter()
        .map(|s| s.to_str().map(String::from))
        .collect::<Option<Vec<_>>>()?;
    let file = segments.pop()?;
    let stem = file.strip_suffix(&format!(".{}", TEMPLATE_EXTENSION))?;
    segments.push(stem.to_string());
    Some(segments.join("/"))
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &JsonValue) -> Result<String> {
        self.validate(template, context)?;

        self.engine.read().render(template, context).map_err(|e| {
            BlogFlowError::template_rendering_error(
                format!("Template rendering failed: {}", e),
                template.to_string(),
                Some(Box::new(e)),
            )
        })
    }

    fn render_source(
        &self,
        name: &str,
        source: &str,
        context: &JsonValue,
    ) -> Result<String> {
        self.engine
            .read()
            .render_template(source, context)
            .map_err(|e| {
                BlogFlowError::template_rendering_error(
                    format!("Template rendering failed: {}", e),
                    name.to_string(),
                    Some(Box::new(e)),
                )
            })
    }

    fn validate(&self, template: &str, _context: &JsonValue) -> Result<()> {
        if !self.has_template(template) {
            return Err(BlogFlowError::template_rendering_error(
                format!(
                    "Template '{}' not found in {}",
                    template,
                    self.template_dir.display()
                ),
                template.to_string(),
                None,
            ));
        }
        Ok(())
    }
}

/// Built-in helpers for template processing.
pub mod helpers {
    use super::TemplateHelper;
    use crate::{BlogFlowError, Result};
    use chrono::format::{Item, StrftimeItems};
    use chrono::NaiveDate;
    use serde_json::Value as JsonValue;
    use std::fmt::Write;

    /// Helper to convert text to uppercase.
    #[derive(Debug, Clone, Copy)]
    pub struct UppercaseHelper;

    impl TemplateHelper for UppercaseHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let text =
                params.first().and_then(|p| p.as_str()).ok_or_else(|| {
                    BlogFlowError::template_rendering_error(
                        "Uppercase helper requires a string parameter",
                        self.name().to_string(),
                        None,
                    )
                })?;
            Ok(JsonValue::String(text.to_uppercase()))
        }

        fn name(&self) -> &str {
            "uppercase"
        }
    }

    /// Formats a `YYYY-MM-DD` date with a `strftime` pattern:
    /// `{{date post.date "%B %-d, %Y"}}`.
    #[derive(Debug, Clone, Copy)]
    pub struct DateHelper;

    impl DateHelper {
        fn error(&self, message: String) -> BlogFlowError {
            BlogFlowError::template_rendering_error(
                message,
                self.name().to_string(),
                None,
            )
        }
    }

    impl TemplateHelper for DateHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let value =
                params.first().and_then(|p| p.as_str()).ok_or_else(|| {
                    self.error(
                        "Date helper requires a date parameter".to_string(),
                    )
                })?;
            let pattern = params
                .get(1)
                .and_then(|p| p.as_str())
                .unwrap_or("%Y-%m-%d");

            let date = value
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .ok_or_else(|| {
                    self.error(format!("`{}` is not a date", value))
                })?;

            if StrftimeItems::new(pattern).any(|i| matches!(i, Item::Error)) {
                return Err(self.error(format!(
                    "`{}` is not a valid date format",
                    pattern
                )));
            }

            let mut formatted = String::new();
            write!(formatted, "{}", date.format(pattern)).map_err(|_| {
                self.error(format!("Failed to format `{}`", value))
            })?;
            Ok(JsonValue::String(formatted))
        }

        fn name(&self) -> &str {
            "date"
        }
    }
}
