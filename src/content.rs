// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Content Module
//!
//! Reads the blog's source tree into posts and pages.
//!
//! ## Posts
//!
//! Posts live in the posts directory and are named
//! `{year}-{month}-{day}-{title}.html.md`. The date comes from the filename,
//! the slug from the title segment, and every post must open with a YAML
//! front matter block:
//!
//! ```text
//! ---
//! title: Hello World
//! tags: [rust]
//! ---
//! Post body in Markdown.
//! ```
//!
//! A file that breaks the convention fails the build with its path rather
//! than being published under a wrong date.
//!
//! ## Pages
//!
//! Every other file under the source directory is a page: Markdown
//! (`*.md`), Handlebars (`*.hbs`) or a static file copied verbatim. Files
//! and directories starting with `.` or `_` are ignored.

use crate::core::config::Config;
use crate::core::error::{BlogFlowError, Result};
use crate::core::traits::ToContext;
use crate::permalink::{expand, slugify, OutputPath};
use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Markdown file extensions.
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Handlebars template extension.
const TEMPLATE_EXTENSION: &str = "hbs";

/// Metadata parsed from a document's front matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    /// Document title.
    pub title: Option<String>,
    /// Short description.
    pub description: Option<String>,
    /// Date as written, if any.
    pub date: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Layout override: `Some(None)` for `layout: false`.
    pub layout: Option<Option<String>>,
    /// Every other field, exposed to templates as `data`.
    pub custom: BTreeMap<String, JsonValue>,
}

impl FrontMatter {
    /// Splits `content` into its front matter and body.
    ///
    /// Returns `Ok((None, content))` when the document has no front matter
    /// block. A block that is opened but never closed, or that is not valid
    /// YAML, is an error.
    pub fn parse(content: &str) -> Result<(Option<Self>, &str)> {
        let Some(rest) = content
            .strip_prefix("---\n")
            .or_else(|| content.strip_prefix("---\r\n"))
        else {
            return Ok((None, content));
        };

        let mut offset = 0;
        let mut block_end = None;
        for line in rest.split_inclusive('\n') {
            if line.trim_end() == "---" {
                block_end = Some((offset, offset + line.len()));
                break;
            }
            offset += line.len();
        }

        let Some((yaml_end, body_start)) = block_end else {
            return Err(BlogFlowError::content_processing_error(
                "Front matter is not closed with `---`",
                None,
            ));
        };

        let yaml = &rest[..yaml_end];
        let fields: HashMap<String, JsonValue> = if yaml.trim().is_empty() {
            HashMap::new()
        } else {
            serde_yml::from_str(yaml).map_err(|e| {
                BlogFlowError::content_processing_error(
                    "Front matter is not valid YAML",
                    Some(Box::new(e)),
                )
            })?
        };

        Ok((Some(Self::from_fields(fields)), &rest[body_start..]))
    }

    fn from_fields(fields: HashMap<String, JsonValue>) -> Self {
        let mut front_matter = Self::default();
        for (key, value) in fields {
            match key.as_str() {
                "title" => front_matter.title = non_empty_string(&value),
                "description" => {
                    front_matter.description = non_empty_string(&value)
                }
                "date" => front_matter.date = non_empty_string(&value),
                "tags" => {
                    front_matter.tags = match &value {
                        JsonValue::Array(tags) => tags
                            .iter()
                            .filter_map(non_empty_string)
                            .collect(),
                        JsonValue::String(tags) => tags
                            .split(',')
                            .map(str::trim)
                            .filter(|t| !t.is_empty())
                            .map(String::from)
                            .collect(),
                        _ => Vec::new(),
                    };
                }
                "layout" => {
                    front_matter.layout = match &value {
                        JsonValue::Bool(false) | JsonValue::Null => Some(None),
                        JsonValue::String(name) => Some(Some(name.clone())),
                        _ => None,
                    };
                }
                _ => {
                    _ = front_matter.custom.insert(key, value);
                }
            }
        }
        front_matter
    }

    /// Front matter as template context.
    pub fn to_json(&self) -> JsonValue {
        json!({
            "title": self.title,
            "description": self.description,
            "tags": self.tags,
            "data": self.custom,
        })
    }
}

fn non_empty_string(value: &JsonValue) -> Option<String> {
    let text = match value {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Date and title segment parsed from a post filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilename {
    /// Publication date.
    pub date: NaiveDate,
    /// Title segment as written, e.g. `hello-world`.
    pub title: String,
}

impl PostFilename {
    /// Parses `{year}-{month}-{day}-{title}.html.md`.
    ///
    /// The `.html` segment is optional; the Markdown extension is not.
    pub fn parse(path: &Path) -> Result<Self> {
        let invalid = |message: &str| {
            BlogFlowError::invalid_post(path.to_path_buf(), message)
        };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| invalid("filename is not valid UTF-8"))?;

        let stem = MARKDOWN_EXTENSIONS
            .iter()
            .find_map(|ext| name.strip_suffix(&format!(".{}", ext)))
            .ok_or_else(|| invalid("post is not a Markdown file"))?;
        let stem = stem.strip_suffix(".html").unwrap_or(stem);

        let mut parts = stem.splitn(4, '-');
        let (Some(year), Some(month), Some(day), Some(title)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid(
                "filename does not match `{year}-{month}-{day}-{title}`",
            ));
        };

        let digits = |s: &str, len: usize| {
            s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(year, 4) || !digits(month, 2) || !digits(day, 2) {
            return Err(invalid(
                "filename does not match `{year}-{month}-{day}-{title}`",
            ));
        }
        if title.trim().is_empty() {
            return Err(invalid("filename has an empty title"));
        }

        let date = match (year.parse(), month.parse(), day.parse()) {
            (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
            _ => None,
        }
        .ok_or_else(|| {
            invalid(&format!("{}-{}-{} is not a valid date", year, month, day))
        })?;

        Ok(Self {
            date,
            title: title.to_string(),
        })
    }
}

/// A blog post.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Source file.
    pub source: PathBuf,
    /// Publication date, from the filename.
    pub date: NaiveDate,
    /// URL slug, from the filename title.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Site path computed from the permalink pattern, e.g. `post/hello-world`.
    pub permalink: String,
    /// Public URL and output file.
    pub output: OutputPath,
    /// Parsed front matter.
    pub front_matter: FrontMatter,
    /// Markdown body, without front matter.
    pub body: String,
    /// Rendered HTML body; empty until the content processor has run.
    pub html: String,
}

impl Post {
    /// Builds a post from its source file and contents.
    pub fn from_source(
        path: &Path,
        content: &str,
        permalink: &str,
        directory_indexes: bool,
    ) -> Result<Self> {
        let filename = PostFilename::parse(path)?;

        let (front_matter, body) = FrontMatter::parse(content)
            .map_err(|e| {
                BlogFlowError::invalid_post(path.to_path_buf(), e.to_string())
            })?;
        let front_matter = front_matter.ok_or_else(|| {
            BlogFlowError::invalid_post(
                path.to_path_buf(),
                "post has no front matter",
            )
        })?;

        if let Some(date) = &front_matter.date {
            let declared = date.get(..10).and_then(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()
            });
            if declared != Some(filename.date) {
                return Err(BlogFlowError::invalid_post(
                    path.to_path_buf(),
                    format!(
                        "front matter date `{}` does not match filename date {}",
                        date, filename.date
                    ),
                ));
            }
        }

        let slug = slugify(&filename.title);
        if slug.is_empty() {
            return Err(BlogFlowError::invalid_post(
                path.to_path_buf(),
                "title does not produce a usable slug",
            ));
        }

        let title = front_matter
            .title
            .clone()
            .or_else(|| first_heading(body))
            .unwrap_or_else(|| humanize(&filename.title));

        let year = format!("{:04}", filename.date.year());
        let month = format!("{:02}", filename.date.month());
        let day = format!("{:02}", filename.date.day());
        let permalink = expand(
            permalink,
            &[
                ("title", slug.as_str()),
                ("year", year.as_str()),
                ("month", month.as_str()),
                ("day", day.as_str()),
            ],
        );
        let output = OutputPath::for_path(&permalink, directory_indexes);

        Ok(Self {
            source: path.to_path_buf(),
            date: filename.date,
            slug,
            title,
            permalink,
            output,
            front_matter,
            body: body.to_string(),
            html: String::new(),
        })
    }
}

impl ToContext for Post {
    fn to_context(&self) -> JsonValue {
        json!({
            "title": self.title,
            "slug": self.slug,
            "date": self.date.format("%Y-%m-%d").to_string(),
            "year": self.date.year(),
            "month": self.date.month(),
            "day": self.date.day(),
            "url": self.output.url,
            "path": self.permalink,
            "description": self.front_matter.description,
            "tags": self.front_matter.tags,
            "data": self.front_matter.custom,
            "content": self.html,
        })
    }
}

/// Text of the first level-one ATX heading in `body`.
pub fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn humanize(title: &str) -> String {
    let words = title.replace(['-', '_'], " ");
    let mut chars = words.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// How a page is turned into output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Markdown rendered to HTML.
    Markdown,
    /// Handlebars template rendered with the site context.
    Template,
    /// Copied byte for byte.
    Static,
}

/// A non-post source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Source file.
    pub source: PathBuf,
    /// Site path with the template extension removed, e.g. `feed.xml`.
    pub path: String,
    /// Public URL and output file.
    pub output: OutputPath,
    /// How the page is rendered.
    pub kind: PageKind,
    /// Parsed front matter; empty for static files.
    pub front_matter: FrontMatter,
    /// Body text; empty for static files.
    pub body: String,
}

impl Page {
    /// Builds a page from a file below the source directory.
    pub fn from_source(
        source_dir: &Path,
        path: &Path,
        directory_indexes: bool,
    ) -> Result<Self> {
        let relative = path
            .strip_prefix(source_dir)
            .map_err(|e| {
                BlogFlowError::content_processing_error(
                    format!(
                        "{} is outside the source directory",
                        path.display()
                    ),
                    Some(Box::new(e)),
                )
            })?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let extension = path.extension().and_then(|e| e.to_str());
        let kind = match extension {
            Some(ext) if MARKDOWN_EXTENSIONS.contains(&ext) => {
                PageKind::Markdown
            }
            Some(TEMPLATE_EXTENSION) => PageKind::Template,
            _ => PageKind::Static,
        };

        let site_path = match kind {
            PageKind::Static => relative,
            _ => relative
                .rsplit_once('.')
                .map(|(stem, _)| stem.to_string())
                .unwrap_or(relative),
        };

        let (front_matter, body) = if kind == PageKind::Static {
            (FrontMatter::default(), String::new())
        } else {
            let content = fs::read_to_string(path)
                .map_err(|e| BlogFlowError::io_error(path.to_path_buf(), e))?;
            let (front_matter, body) =
                FrontMatter::parse(&content).map_err(|e| {
                    BlogFlowError::content_processing_error(
                        format!("{}: {}", path.display(), e),
                        None,
                    )
                })?;
            (front_matter.unwrap_or_default(), body.to_string())
        };

        let output = if kind == PageKind::Static {
            OutputPath::for_path(&site_path, false)
        } else {
            OutputPath::for_path(&site_path, directory_indexes)
        };

        Ok(Self {
            source: path.to_path_buf(),
            path: site_path,
            output,
            kind,
            front_matter,
            body,
        })
    }
}

/// Loads every post from the configured posts directory.
///
/// Files and directories whose name starts with `.` or `_` are skipped;
/// every other file must be a valid post. A missing posts directory means the blog has no
/// posts yet.
pub fn load_posts(config: &Config) -> Result<Vec<Post>> {
    let posts_dir = config.posts_path();
    if !posts_dir.is_dir() {
        warn!("Posts directory {} not found", posts_dir.display());
        return Ok(Vec::new());
    }

    let mut posts = Vec::new();
    let walker = WalkDir::new(&posts_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e.path(), &posts_dir));

    for entry in walker {
        let entry = entry.map_err(|e| {
            BlogFlowError::content_processing_error(
                format!("Failed to read {}", posts_dir.display()),
                Some(Box::new(e)),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        debug!("Reading post {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| BlogFlowError::io_error(path.to_path_buf(), e))?;
        posts.push(Post::from_source(
            path,
            &content,
            &config.blog.permalink,
            config.output.directory_indexes,
        )?);
    }
    Ok(posts)
}

/// Loads every page below the source directory, skipping the posts and
/// template directories.
pub fn load_pages(config: &Config) -> Result<Vec<Page>> {
    let source_dir = config.source_path();
    let posts_dir = config.posts_path();
    let template_dir = config.template_path();

    let mut pages = Vec::new();
    let walker = WalkDir::new(&source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.path() != posts_dir
                && e.path() != template_dir
                && !is_ignored(e.path(), &source_dir)
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            BlogFlowError::content_processing_error(
                format!("Failed to read {}", source_dir.display()),
                Some(Box::new(e)),
            )
        })?;
        if entry.file_type().is_file() {
            debug!("Reading page {}", entry.path().display());
            pages.push(Page::from_source(
                &source_dir,
                entry.path(),
                config.output.directory_indexes,
            )?);
        }
    }
    Ok(pages)
}

/// Whether the last component of `path` (below `root`) is hidden or
/// private.
fn is_ignored(path: &Path, root: &Path) -> bool {
    path != root
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.') || n.starts_with('_'))
}
