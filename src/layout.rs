// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Layout Resolution
//!
//! Decides which layout wraps a rendered document. The decision is a pure
//! function of the route, the document kind and the document's own front
//! matter, checked in this order:
//!
//! 1. a `layout` key in the front matter (`false` disables the layout)
//! 2. the first wildcard rule whose pattern matches the route
//! 3. an exact route mapping such as `"/" = "landing"`
//! 4. the kind default: posts use the blog layout
//! 5. the global default layout

use crate::core::config::LayoutConfig;
use crate::core::error::{BlogFlowError, Result};
use regex::Regex;
use std::collections::BTreeMap;

/// What kind of document is being wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A blog post.
    Post,
    /// A listing page.
    Listing,
    /// Any other page.
    Page,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: String,
    regex: Regex,
    layout: Option<String>,
}

/// Resolves the layout for every route of the site.
#[derive(Debug, Clone)]
pub struct LayoutResolver {
    default: String,
    post_layout: String,
    routes: BTreeMap<String, String>,
    rules: Vec<CompiledRule>,
}

impl LayoutResolver {
    /// Compiles the configured rules.
    ///
    /// Patterns support `*` (any run of characters) and `?` (one
    /// character). A pattern without a leading `/` is matched against the
    /// route without its leading `/`.
    pub fn new(config: &LayoutConfig, post_layout: &str) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    pattern: rule.pattern.clone(),
                    regex: glob_to_regex(&rule.pattern)?,
                    layout: rule.layout.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let routes = config
            .routes
            .iter()
            .map(|(route, layout)| (normalize_route(route), layout.clone()))
            .collect();

        Ok(Self {
            default: config.default.clone(),
            post_layout: post_layout.to_string(),
            routes,
            rules,
        })
    }

    /// Returns the layout name for a document, or `None` when it is
    /// published without a layout.
    ///
    /// `front_matter` is the document's own `layout` key: `Some(None)` for
    /// `layout: false`, `None` when the key is absent.
    pub fn resolve(
        &self,
        route: &str,
        kind: DocumentKind,
        front_matter: Option<&Option<String>>,
    ) -> Option<String> {
        if let Some(layout) = front_matter {
            return layout.clone();
        }

        let route = normalize_route(route);
        let relative = route.trim_start_matches('/');
        if let Some(rule) = self.rules.iter().find(|rule| {
            if rule.pattern.starts_with('/') {
                rule.regex.is_match(&route)
            } else {
                rule.regex.is_match(relative)
            }
        }) {
            return rule.layout.clone();
        }

        if let Some(layout) = self.routes.get(&route) {
            return Some(layout.clone());
        }

        match kind {
            DocumentKind::Post => Some(self.post_layout.clone()),
            DocumentKind::Listing | DocumentKind::Page => {
                Some(self.default.clone())
            }
        }
    }
}

/// Translates a wildcard pattern into an anchored regular expression.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut source = String::from("^");
    let mut buffer = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            _ => source.push_str(&regex::escape(c.encode_utf8(&mut buffer))),
        }
    }
    source.push('$');

    Regex::new(&source).map_err(|e| {
        BlogFlowError::config_error(
            format!("Invalid layout pattern `{}`: {}", pattern, e),
            None,
        )
    })
}

/// Normalises a route to `/path`, dropping `index.html` and trailing
/// slashes.
fn normalize_route(route: &str) -> String {
    let route = route.strip_suffix("index.html").unwrap_or(route);
    let trimmed = route.trim_matches('/');
    format!("/{}", trimmed)
}
