// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Configuration Module
//!
//! Provides the site-wide build configuration for BlogFlow. A single
//! [`Config`] value is loaded once at startup and handed to every pipeline
//! stage; nothing reads configuration from global state.
//!
//! ## Sources
//!
//! - A TOML file (conventionally `blogflow.toml`)
//! - Environment variables with a prefix (for example `BLOGFLOW_OUTPUT_DIR`);
//!   prefixed variables that name no configuration key are skipped
//! - Programmatic overrides
//!
//! Relative paths are resolved against the directory holding the
//! configuration file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use blogflow::core::config::{ConfigBuilder, Profile};
//!
//! let config = ConfigBuilder::new()
//!     .with_file("blogflow.toml")
//!     .with_env_prefix("BLOGFLOW_")
//!     .with_profile(Profile::Production)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.profile, Profile::Production);
//! assert_eq!(config.blog.per_page, 5);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use toml::Value as TomlValue;

use crate::core::error::{BlogFlowError, Result};
use crate::process::normalize;
use log::warn;

/// Name of the configuration file looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "blogflow.toml";

/// Specifies operational profiles for configuration.
///
/// The profile is exposed to templates as `site.environment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Development profile with settings optimised for debugging.
    Development,
    /// Staging profile for intermediate testing between development and production.
    Staging,
    /// Production profile with performance-focused settings.
    Production,
    /// Custom profile enabling specific user configurations.
    Custom,
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Development
    }
}

impl Profile {
    /// Returns the lowercase name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Staging => "staging",
            Profile::Production => "production",
            Profile::Custom => "custom",
        }
    }

    /// Parses a profile name; unknown names map to [`Profile::Custom`].
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "development" => Profile::Development,
            "staging" => Profile::Staging,
            "production" => Profile::Production,
            _ => Profile::Custom,
        }
    }
}

/// Represents the main configuration structure encompassing all build settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Project root every relative path is resolved against.
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default = "default_source_dir")]
    /// Directory holding posts, pages and layouts.
    pub source_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    /// Directory the finished site is published to.
    pub output_dir: PathBuf,

    #[serde(default = "default_template_dir")]
    /// Directory holding the Handlebars layouts and partials.
    pub template_dir: PathBuf,

    #[serde(default)]
    /// Indicates the current operational profile.
    pub profile: Profile,

    #[serde(default)]
    /// Site-wide values exposed to every template as `site`.
    pub site: BTreeMap<String, TomlValue>,

    #[serde(default)]
    /// Blog engine settings: sources, permalinks and pagination.
    pub blog: BlogConfig,

    #[serde(default)]
    /// Markdown rendering options.
    pub markdown: MarkdownConfig,

    #[serde(default)]
    /// Syntax highlighting options.
    pub highlight: HighlightConfig,

    #[serde(default)]
    /// Layout resolution rules.
    pub layout: LayoutConfig,

    #[serde(default)]
    /// Configuration for output generation settings.
    pub output: OutputConfig,

    #[serde(default)]
    /// Built-in asset pipeline settings.
    pub assets: AssetConfig,

    #[serde(default)]
    /// External asset pipeline; when absent the built-in bundler runs.
    pub external: Option<ExternalConfig>,
}

/// Blog engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    /// Posts directory, relative to the source directory.
    pub sources: PathBuf,
    /// Permalink pattern; supports `{title}`, `{year}`, `{month}` and `{day}`.
    pub permalink: String,
    /// Layout every post is wrapped in unless overridden.
    pub layout: String,
    /// Number of posts on each listing page.
    pub per_page: usize,
    /// Path pattern of listing pages after the first; must contain `{num}`.
    pub page_link: String,
    /// Route of the first listing page.
    pub listing_path: String,
    /// Template rendering the body of each listing page.
    pub listing_template: String,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            sources: PathBuf::from("posts"),
            permalink: "post/{title}".to_string(),
            layout: "post".to_string(),
            per_page: 5,
            page_link: "page/{num}".to_string(),
            listing_path: "/".to_string(),
            listing_template: "listing".to_string(),
        }
    }
}

/// Markdown rendering options. Fenced code blocks are always enabled.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Substitute typographic quotes and dashes.
    pub smartypants: bool,
    /// Enable GitHub-style tables.
    pub tables: bool,
    /// Enable footnotes.
    pub footnotes: bool,
    /// Enable `~~strikethrough~~`.
    pub strikethrough: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            smartypants: true,
            tables: false,
            footnotes: false,
            strikethrough: false,
        }
    }
}

/// Syntax highlighting options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Highlight fenced code blocks at all.
    pub enabled: bool,
    /// Languages whose samples start inside code, without an opening tag.
    pub start_inline: Vec<String>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_inline: vec!["php".to_string()],
        }
    }
}

/// A wildcard route rule mapping matching routes to a layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLayoutRule")]
pub struct LayoutRule {
    /// Glob-style route pattern (`*` and `?` wildcards).
    pub pattern: String,
    /// Layout name, or `None` for `layout = false`.
    pub layout: Option<String>,
}

/// A layout rule as written in the configuration file.
#[derive(Debug, Deserialize)]
pub struct RawLayoutRule {
    pattern: String,
    layout: JsonValue,
}

impl TryFrom<RawLayoutRule> for LayoutRule {
    type Error = String;

    fn try_from(raw: RawLayoutRule) -> std::result::Result<Self, String> {
        let layout = match raw.layout {
            JsonValue::String(name) => Some(name),
            JsonValue::Bool(false) => None,
            other => {
                return Err(format!(
                    "layout for `{}` must be a name or `false`, found {}",
                    raw.pattern, other
                ))
            }
        };
        Ok(Self {
            pattern: raw.pattern,
            layout,
        })
    }
}

impl LayoutRule {
    /// Creates a rule that renders matching routes without a layout.
    pub fn without_layout<S: Into<String>>(pattern: S) -> Self {
        Self {
            pattern: pattern.into(),
            layout: None,
        }
    }
}

/// Layout resolution rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Global default layout.
    pub default: String,
    /// Exact route to layout mappings, such as `"/" = "landing"`.
    pub routes: BTreeMap<String, String>,
    /// Wildcard rules, tried in order.
    pub rules: Vec<LayoutRule>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let mut routes = BTreeMap::new();
        _ = routes.insert("/".to_string(), "landing".to_string());
        Self {
            default: "layout".to_string(),
            routes,
            rules: vec![
                LayoutRule::without_layout("*.xml"),
                LayoutRule::without_layout("*.json"),
                LayoutRule::without_layout("*.txt"),
            ],
        }
    }
}

/// Configuration settings for output generation.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Minify generated HTML documents.
    pub minify: bool,
    /// Write `name.html` routes as `name/index.html`.
    pub directory_indexes: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            minify: false,
            directory_indexes: true,
        }
    }
}

/// A vendor file or directory copied verbatim into the asset output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VendorAsset {
    /// Installed location, relative to the project root.
    pub source: PathBuf,
    /// Destination, relative to the asset build directory.
    pub destination: PathBuf,
}

/// Built-in asset pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// JavaScript entry module; no bundle is produced when unset.
    pub entry: Option<PathBuf>,
    /// Bundle destination, relative to the asset build directory.
    pub destination: PathBuf,
    /// Directory the asset pipeline writes into.
    pub build_dir: PathBuf,
    /// Vendor copy manifest.
    pub vendor: Vec<VendorAsset>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            entry: None,
            destination: PathBuf::from("javascripts/all.js"),
            build_dir: PathBuf::from(".tmp/dist"),
            vendor: Vec::new(),
        }
    }
}

/// External asset pipeline, run as a separate process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Display name used in logs and errors.
    pub name: String,
    /// Program and arguments.
    pub command: Vec<String>,
    /// Directory the process leaves its output in.
    pub source: PathBuf,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            name: "gulp".to_string(),
            command: vec!["gulp".to_string()],
            source: PathBuf::from(".tmp/dist"),
        }
    }
}

/// Builds a `Config` instance from a file, environment and overrides.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<PathBuf>,
    root: Option<PathBuf>,
    env_prefix: Option<String>,
    profile: Option<Profile>,
    overrides: HashMap<String, TomlValue>,
}

impl ConfigBuilder {
    /// Initialises a new `ConfigBuilder` instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a configuration file to the builder.
    ///
    /// Unless [`with_root`](Self::with_root) is called, the file's directory
    /// becomes the project root.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the project root explicitly.
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Adds a prefix for environment variables to override configuration values.
    pub fn with_env_prefix<S: Into<String>>(
        mut self,
        prefix: S,
    ) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Sets the profile for the configuration.
    pub fn with_profile<P: Into<Profile>>(
        mut self,
        profile: P,
    ) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Adds a key-value pair to override configuration values.
    ///
    /// Keys are either top-level (`output_dir`) or `section.key`
    /// (`blog.per_page`, `site.title`).
    pub fn with_override<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<TomlValue>,
    {
        _ = self.overrides.insert(key.into(), value.into());
        self
    }

    /// Builds the final configuration by applying all specified settings
    /// and overrides, then validates it.
    pub fn build(self) -> Result<Config> {
        let mut config = if let Some(path) = &self.config_file {
            load_from_file(path)?
        } else {
            Config::default()
        };

        config.root = match (self.root, &self.config_file) {
            (Some(root), _) => root,
            (None, Some(file)) => file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            (None, None) => PathBuf::new(),
        };

        if let Some(profile) = self.profile {
            config.profile = profile;
        }

        if let Some(prefix) = self.env_prefix {
            apply_env_overrides(&mut config, &prefix)?;
        }

        apply_overrides(&mut config, &self.overrides)?;
        validate_config(&config)?;

        Ok(config)
    }
}

impl Config {
    /// Parses a configuration from TOML text without validating it.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            BlogFlowError::config_error(
                format!("Failed to parse config: {}", e),
                None,
            )
        })
    }

    /// Validates the configuration: directories exist, patterns are well
    /// formed and nothing the build deletes overlaps the project.
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }

    /// Resolves a configured path against the project root.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Absolute source directory.
    pub fn source_path(&self) -> PathBuf {
        self.resolve(&self.source_dir)
    }

    /// Absolute posts directory.
    pub fn posts_path(&self) -> PathBuf {
        self.source_path().join(&self.blog.sources)
    }

    /// Absolute template directory.
    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.template_dir)
    }

    /// Absolute output directory.
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Site-wide template values, including `environment`.
    pub fn site_context(&self) -> JsonValue {
        let mut site = serde_json::Map::new();
        for (key, value) in &self.site {
            let value =
                serde_json::to_value(value).unwrap_or(JsonValue::Null);
            _ = site.insert(key.clone(), value);
        }
        _ = site.insert(
            "environment".to_string(),
            JsonValue::String(self.profile.as_str().to_string()),
        );
        JsonValue::Object(site)
    }
}

impl Default for Config {
    /// Creates a `Config` with the conventional blog layout: `source/`,
    /// `source/posts/`, `source/layouts/` and `build/`.
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            template_dir: default_template_dir(),
            profile: Profile::default(),
            site: BTreeMap::new(),
            blog: BlogConfig::default(),
            markdown: MarkdownConfig::default(),
            highlight: HighlightConfig::default(),
            layout: LayoutConfig::default(),
            output: OutputConfig::default(),
            assets: AssetConfig::default(),
            external: None,
        }
    }
}

// Internal helper functions

fn load_from_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        BlogFlowError::config_error(
            format!("Failed to read config file: {}", e),
            Some(path.to_path_buf()),
        )
    })?;

    toml::from_str(&content).map_err(|e| {
        BlogFlowError::config_error(
            format!("Failed to parse config file: {}", e),
            Some(path.to_path_buf()),
        )
    })
}

fn apply_env_overrides(
    config: &mut Config,
    prefix: &str,
) -> Result<()> {
    let mut vars: Vec<(String, String)> = env::vars().collect();
    vars.sort();
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(prefix) {
            let config_key =
                stripped.trim_start_matches('_').to_lowercase();
            if !is_override_key(&config_key) {
                warn!(
                    "Ignoring {}: `{}` is not a configuration key",
                    key, config_key
                );
                continue;
            }
            apply_config_value(config, &config_key, &value)?;
        }
    }
    Ok(())
}

/// Keys accepted by [`apply_config_value`], besides any `site.*` key.
const OVERRIDE_KEYS: &[&str] = &[
    "source_dir",
    "output_dir",
    "template_dir",
    "profile",
    "blog.sources",
    "blog.permalink",
    "blog.layout",
    "blog.page_link",
    "blog.listing_path",
    "blog.listing_template",
    "blog.per_page",
    "markdown.smartypants",
    "markdown.tables",
    "markdown.footnotes",
    "markdown.strikethrough",
    "highlight.enabled",
    "highlight.start_inline",
    "layout.default",
    "output.minify",
    "output.directory_indexes",
];

fn is_override_key(key: &str) -> bool {
    key.strip_prefix("site.").is_some_and(|k| !k.is_empty())
        || OVERRIDE_KEYS.contains(&key)
}

fn apply_overrides(
    config: &mut Config,
    overrides: &HashMap<String, TomlValue>,
) -> Result<()> {
    let mut keys: Vec<&String> = overrides.keys().collect();
    keys.sort();
    for key in keys {
        let value = match &overrides[key] {
            TomlValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        apply_config_value(config, key, &value)?;
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    validate_path(&config.source_path(), "source", true)?;
    validate_path(&config.template_path(), "template", true)?;

    if config.blog.per_page == 0 {
        return Err(BlogFlowError::config_error(
            "blog.per_page must be at least 1",
            None,
        ));
    }

    if !config.blog.permalink.contains("{title}") {
        return Err(BlogFlowError::config_error(
            format!(
                "blog.permalink `{}` must contain `{{title}}`",
                config.blog.permalink
            ),
            None,
        ));
    }

    if !config.blog.page_link.contains("{num}") {
        return Err(BlogFlowError::config_error(
            format!(
                "blog.page_link `{}` must contain `{{num}}`",
                config.blog.page_link
            ),
            None,
        ));
    }

    if let Some(external) = &config.external {
        if external.command.is_empty() {
            return Err(BlogFlowError::config_error(
                "external.command must name a program",
                None,
            ));
        }
    }

    validate_disposable_dir(config, &config.output_path(), "output_dir")?;
    validate_disposable_dir(
        config,
        &config.resolve(&config.assets.build_dir),
        "assets.build_dir",
    )?;

    Ok(())
}

/// Rejects a directory the build deletes and recreates when it would take
/// the project root, source or templates with it.
fn validate_disposable_dir(
    config: &Config,
    dir: &Path,
    name: &str,
) -> Result<()> {
    let dir = normalize(dir);
    for (label, protected) in [
        ("project root", config.resolve("")),
        ("source directory", config.source_path()),
        ("template directory", config.template_path()),
    ] {
        if normalize(&protected).starts_with(&dir) {
            return Err(BlogFlowError::config_error(
                format!(
                    "{} `{}` would replace the {}",
                    name,
                    dir.display(),
                    label
                ),
                Some(dir),
            ));
        }
    }
    Ok(())
}

fn apply_config_value(
    config: &mut Config,
    key: &str,
    value: &str,
) -> Result<()> {
    let value = value.trim_matches('"');
    match key {
        "source_dir" => config.source_dir = PathBuf::from(value),
        "output_dir" => config.output_dir = PathBuf::from(value),
        "template_dir" => config.template_dir = PathBuf::from(value),
        "profile" => config.profile = Profile::from_name(value),
        _ => {
            let Some((section, key)) = key.split_once('.') else {
                return Err(BlogFlowError::config_error(
                    format!("Unknown configuration key: {}", key),
                    None,
                ));
            };
            match section {
                "blog" => apply_blog_value(&mut config.blog, key, value)?,
                "markdown" => {
                    apply_markdown_value(&mut config.markdown, key, value)?
                }
                "highlight" => {
                    apply_highlight_value(&mut config.highlight, key, value)?
                }
                "layout" if key == "default" => {
                    config.layout.default = value.to_string()
                }
                "output" => {
                    apply_output_value(&mut config.output, key, value)?
                }
                "site" => {
                    _ = config.site.insert(
                        key.to_string(),
                        TomlValue::String(value.to_string()),
                    );
                }
                _ => {
                    return Err(BlogFlowError::config_error(
                        format!(
                            "Unknown configuration key: {}.{}",
                            section, key
                        ),
                        None,
                    ));
                }
            }
        }
    }
    Ok(())
}

fn apply_blog_value(
    config: &mut BlogConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "sources" => config.sources = PathBuf::from(value),
        "permalink" => config.permalink = value.to_string(),
        "layout" => config.layout = value.to_string(),
        "page_link" => config.page_link = value.to_string(),
        "listing_path" => config.listing_path = value.to_string(),
        "listing_template" => {
            config.listing_template = value.to_string()
        }
        "per_page" => {
            config.per_page = value.parse().map_err(|e| {
                BlogFlowError::config_error(
                    format!("Invalid per_page value '{}': {}", value, e),
                    None,
                )
            })?;
        }
        _ => return Err(unknown_key("blog", key)),
    }
    Ok(())
}

fn apply_markdown_value(
    config: &mut MarkdownConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "smartypants" => config.smartypants = parse_bool(key, value)?,
        "tables" => config.tables = parse_bool(key, value)?,
        "footnotes" => config.footnotes = parse_bool(key, value)?,
        "strikethrough" => {
            config.strikethrough = parse_bool(key, value)?
        }
        _ => return Err(unknown_key("markdown", key)),
    }
    Ok(())
}

fn apply_highlight_value(
    config: &mut HighlightConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "enabled" => config.enabled = parse_bool(key, value)?,
        "start_inline" => {
            config.start_inline = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        _ => return Err(unknown_key("highlight", key)),
    }
    Ok(())
}

fn apply_output_value(
    config: &mut OutputConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "minify" => config.minify = parse_bool(key, value)?,
        "directory_indexes" => {
            config.directory_indexes = parse_bool(key, value)?
        }
        _ => return Err(unknown_key("output", key)),
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value.parse().map_err(|e| {
        BlogFlowError::config_error(
            format!("Invalid {} value '{}': {}", key, value, e),
            None,
        )
    })
}

fn unknown_key(section: &str, key: &str) -> BlogFlowError {
    BlogFlowError::config_error(
        format!("Unknown configuration key: {}.{}", section, key),
        None,
    )
}

fn validate_path(
    path: &Path,
    name: &str,
    must_exist: bool,
) -> Result<()> {
    if must_exist && !path.exists() {
        return Err(BlogFlowError::config_error(
            format!(
                "{} directory does not exist: {}",
                name,
                path.display()
            ),
            Some(path.to_path_buf()),
        ));
    }

    if path.exists() && !path.is_dir() {
        return Err(BlogFlowError::config_error(
            format!(
                "{} path is not a directory: {}",
                name,
                path.display()
            ),
            Some(path.to_path_buf()),
        ));
    }

    Ok(())
}

// Default value functions
fn default_source_dir() -> PathBuf {
    PathBuf::from("source")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("source/layouts")
}
