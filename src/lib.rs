// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # BlogFlow Library
//!
//! BlogFlow builds a static blog: Markdown posts and pages are rendered,
//! paginated and wrapped in Handlebars layouts, while an asset pipeline
//! bundles JavaScript and copies vendor files. Both halves run concurrently
//! and are merged into one output tree that is published only when every
//! stage succeeded.
//!
//! For more information, visit the [BlogFlow documentation](https://docs.rs/blogflow).

#![doc = include_str!("../README.md")]
#![doc(html_root_url = "https://docs.rs/blogflow")]

use crate::assets::AssetBundler;
use crate::content::{
    first_heading, load_pages, load_posts, FrontMatter, Page, PageKind, Post,
};
use crate::core::traits::ToContext;
use crate::external::ExternalPipeline;
use crate::generators::HtmlGenerator;
use crate::layout::{DocumentKind, LayoutResolver};
use crate::paginate::{sort_posts, ListingPage, Paginator};
use crate::permalink::OutputPath;
use crate::process::{copy_file, merge_dir, publish};
use crate::processors::MarkdownProcessor;
use crate::template::HandlebarsRenderer;
use log::{debug, info};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

pub use crate::core::config::Config;
pub use crate::core::error::{BlogFlowError, Result};

/// Module containing core utilities, such as configuration and error handling.
pub mod core;

/// Built-in JavaScript bundler and vendor copier.
pub mod assets;

/// Provides command-line interface utilities.
pub mod cli;

/// Posts, pages and front matter.
pub mod content;

/// External asset build process.
pub mod external;

/// Provides output generation utilities.
pub mod generators;

/// Layout resolution rules.
pub mod layout;

/// Listing pagination.
pub mod paginate;

/// Slugs, permalink patterns and output paths.
pub mod permalink;

/// Filesystem helpers for copying, merging and publishing.
pub mod process;

/// Content processors (Markdown, syntax highlighting).
pub mod processors;

/// Provides template rendering utilities.
pub mod template;

/// Trait for content processing implementations.
///
/// Implementations turn a source body into HTML.
pub trait ContentProcessor: Send + Sync + std::fmt::Debug {
    /// Processes the provided content with an optional context.
    ///
    /// # Arguments
    /// * `content` - The content to be processed.
    /// * `context` - An optional context for additional processing.
    ///
    /// # Returns
    /// * `Result<String>` - The processed content, or an error if processing fails.
    fn process(
        &self,
        content: &str,
        context: Option<&JsonValue>,
    ) -> Result<String>;

    /// Validates the content without processing.
    fn validate(&self, content: &str) -> Result<()>;
}

/// Trait for template rendering implementations.
pub trait TemplateRenderer: Send + Sync + std::fmt::Debug {
    /// Renders a registered template with the specified context.
    ///
    /// # Arguments
    /// * `template` - The template name.
    /// * `context` - The context data for rendering the template.
    ///
    /// # Returns
    /// * `Result<String>` - The rendered output; an unknown template is an error.
    fn render(&self, template: &str, context: &JsonValue) -> Result<String>;

    /// Renders template source that is not registered, such as a
    /// `feed.xml.hbs` page. `name` is used in error messages.
    fn render_source(
        &self,
        name: &str,
        source: &str,
        context: &JsonValue,
    ) -> Result<String>;

    /// Checks that `template` exists and can be rendered with `context`.
    fn validate(&self, template: &str, context: &JsonValue) -> Result<()>;
}

/// Trait for output generation implementations.
pub trait OutputGenerator: Send + Sync + std::fmt::Debug {
    /// Generates output from the given content to the specified path.
    ///
    /// # Arguments
    /// * `content` - The content to be output.
    /// * `path` - The output file path.
    /// * `options` - Optional settings for generation.
    fn generate(
        &self,
        content: &str,
        path: &Path,
        options: Option<&JsonValue>,
    ) -> Result<()>;

    /// Validates the path and options for output generation.
    fn validate(&self, path: &Path, options: Option<&JsonValue>) -> Result<()>;
}

/// A published route and how it is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Public URL.
    pub url: String,
    /// Output file, relative to the output directory.
    pub file: PathBuf,
    /// Layout wrapping the document, if any.
    pub layout: Option<String>,
    /// Source file; `None` for listing pages.
    pub source: Option<PathBuf>,
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Posts rendered.
    pub posts: usize,
    /// Listing pages rendered.
    pub listing_pages: usize,
    /// Markdown and template pages rendered.
    pub pages: usize,
    /// Static files copied from the source tree.
    pub static_files: usize,
    /// Files merged from the asset pipeline.
    pub asset_files: usize,
    /// Directory the site was published to.
    pub output: PathBuf,
}

/// Everything the content side will produce, before rendering.
#[derive(Debug)]
struct SitePlan {
    posts: Vec<Post>,
    listing: Vec<ListingPage>,
    pages: Vec<Page>,
}

/// Main build pipeline for BlogFlow.
#[derive(Debug)]
pub struct BlogFlow {
    config: Config,
    content_processor: Box<dyn ContentProcessor>,
    template_renderer: Box<dyn TemplateRenderer>,
    output_generator: Box<dyn OutputGenerator>,
    layouts: LayoutResolver,
    run_external: bool,
}

impl BlogFlow {
    /// Creates a pipeline from explicit components.
    pub fn new(
        config: Config,
        content_processor: Box<dyn ContentProcessor>,
        template_renderer: Box<dyn TemplateRenderer>,
        output_generator: Box<dyn OutputGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let layouts = LayoutResolver::new(&config.layout, &config.blog.layout)?;
        Ok(Self {
            config,
            content_processor,
            template_renderer,
            output_generator,
            layouts,
            run_external: true,
        })
    }

    /// Creates the standard pipeline: Markdown with highlighting,
    /// Handlebars layouts from the template directory and the HTML writer.
    pub fn from_config(config: Config) -> Result<Self> {
        let processor =
            MarkdownProcessor::from_config(&config.markdown, &config.highlight);
        let renderer = HandlebarsRenderer::new(&config.template_path())?;
        let generator =
            HtmlGenerator::new().with_minification(config.output.minify);
        Self::new(
            config,
            Box::new(processor),
            Box::new(renderer),
            Box::new(generator),
        )
    }

    /// Enables or disables the configured external asset pipeline. When
    /// disabled, the built-in bundler runs instead.
    pub fn with_external_pipeline(mut self, enabled: bool) -> Self {
        self.run_external = enabled;
        self
    }

    /// The configuration the pipeline was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads and validates the content tree without rendering it.
    fn plan(&self) -> Result<SitePlan> {
        let mut posts = load_posts(&self.config)?;
        sort_posts(&mut posts);

        let mut permalinks: BTreeMap<&str, &Path> = BTreeMap::new();
        for post in &posts {
            if let Some(first) =
                permalinks.insert(&post.output.url, &post.source)
            {
                return Err(BlogFlowError::invalid_post(
                    post.source.clone(),
                    format!(
                        "permalink {} is already used by {}",
                        post.output.url,
                        first.display()
                    ),
                ));
            }
        }

        let listing = Paginator::new(&self.config.blog).paginate(posts.len());
        let pages = load_pages(&self.config)?;

        let mut outputs: BTreeMap<&Path, String> = BTreeMap::new();
        let claims = posts
            .iter()
            .map(|p| (&p.output, p.source.display().to_string()))
            .chain(
                listing
                    .iter()
                    .map(|l| (&l.output, format!("listing page {}", l.number))),
            )
            .chain(
                pages
                    .iter()
                    .map(|p| (&p.output, p.source.display().to_string())),
            );
        for (output, owner) in claims {
            if let Some(first) = outputs.insert(&output.file, owner.clone()) {
                return Err(BlogFlowError::output_generation_error(
                    format!("{} and {} both write {}", first, owner, output.url),
                    output.file.clone(),
                    None,
                ));
            }
        }

        debug!(
            "Planned {} post(s), {} listing page(s), {} page(s)",
            posts.len(),
            listing.len(),
            pages.len()
        );
        Ok(SitePlan {
            posts,
            listing,
            pages,
        })
    }

    fn page_layout(&self, page: &Page) -> Option<String> {
        match page.kind {
            PageKind::Static => None,
            PageKind::Markdown | PageKind::Template => self.layouts.resolve(
                &page.output.url,
                DocumentKind::Page,
                page.front_matter.layout.as_ref(),
            ),
        }
    }

    /// Lists every route the build would publish with its layout, sorted
    /// by URL.
    pub fn routes(&self) -> Result<Vec<Route>> {
        let plan = self.plan()?;
        let mut routes = Vec::new();

        for post in &plan.posts {
            routes.push(Route {
                url: post.output.url.clone(),
                file: post.output.file.clone(),
                layout: self.layouts.resolve(
                    &post.output.url,
                    DocumentKind::Post,
                    post.front_matter.layout.as_ref(),
                ),
                source: Some(post.source.clone()),
            });
        }
        for listing in &plan.listing {
            routes.push(Route {
                url: listing.output.url.clone(),
                file: listing.output.file.clone(),
                layout: self.layouts.resolve(
                    &listing.output.url,
                    DocumentKind::Listing,
                    None,
                ),
                source: None,
            });
        }
        for page in &plan.pages {
            routes.push(Route {
                url: page.output.url.clone(),
                file: page.output.file.clone(),
                layout: self.page_layout(page),
                source: Some(page.source.clone()),
            });
        }

        routes.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(routes)
    }

    /// Wraps `content` in `layout`, or returns it unchanged without one.
    fn apply_layout(
        &self,
        layout: Option<String>,
        mut context: JsonValue,
        content: String,
    ) -> Result<String> {
        match layout {
            Some(name) => {
                context["content"] = JsonValue::String(content);
                self.template_renderer.render(&name, &context)
            }
            None => Ok(content),
        }
    }

    fn write(&self, root: &Path, output: &OutputPath, content: &str) -> Result<()> {
        self.output_generator
            .generate(content, &root.join(&output.file), None)
    }

    /// Renders every post, listing page and page into `destination`.
    pub fn render_site(&self, destination: &Path) -> Result<BuildReport> {
        let mut plan = self.plan()?;
        info!("Rendering {} post(s)", plan.posts.len());

        for post in &mut plan.posts {
            post.html = self
                .content_processor
                .process(&post.body, None)
                .map_err(|e| {
                    BlogFlowError::content_processing_error(
                        format!("Failed to render {}", post.source.display()),
                        Some(Box::new(e)),
                    )
                })?;
        }

        let base = json!({
            "site": self.config.site_context(),
            "blog": { "posts": plan.posts.to_context() },
        });
        let mut report = BuildReport::default();

        for post in &plan.posts {
            let mut context = document_context(
                &base,
                &post.front_matter,
                Some(&post.title),
                &post.output.url,
            );
            context["post"] = post.to_context();
            let layout = self.layouts.resolve(
                &post.output.url,
                DocumentKind::Post,
                post.front_matter.layout.as_ref(),
            );
            let html = self.apply_layout(layout, context, post.html.clone())?;
            self.write(destination, &post.output, &html)?;
            report.posts += 1;
        }

        for listing in &plan.listing {
            let title = (listing.number > 1)
                .then(|| format!("Page {}", listing.number));
            let mut context = document_context(
                &base,
                &FrontMatter::default(),
                title.as_deref(),
                &listing.output.url,
            );
            context["posts"] = plan.posts[listing.posts.clone()].to_context();
            context["pagination"] = listing.to_context();

            let body = self
                .template_renderer
                .render(&self.config.blog.listing_template, &context)?;
            let layout = self.layouts.resolve(
                &listing.output.url,
                DocumentKind::Listing,
                None,
            );
            let html = self.apply_layout(layout, context, body)?;
            self.write(destination, &listing.output, &html)?;
            report.listing_pages += 1;
        }

        for page in &plan.pages {
            if page.kind == PageKind::Static {
                _ = copy_file(&page.source, &destination.join(&page.output.file))?;
                report.static_files += 1;
                continue;
            }

            let title = page
                .front_matter
                .title
                .clone()
                .or_else(|| first_heading(&page.body));
            let context = document_context(
                &base,
                &page.front_matter,
                title.as_deref(),
                &page.output.url,
            );
            let body = match page.kind {
                PageKind::Markdown => {
                    self.content_processor.process(&page.body, Some(&context))?
                }
                _ => self.template_renderer.render_source(
                    &page.path,
                    &page.body,
                    &context,
                )?,
            };
            let html = self.apply_layout(self.page_layout(page), context, body)?;
            self.write(destination, &page.output, &html)?;
            report.pages += 1;
        }

        info!(
            "Rendered {} post(s), {} listing page(s), {} page(s)",
            report.posts, report.listing_pages, report.pages
        );
        Ok(report)
    }

    /// Runs the asset side of the build and returns the directory holding
    /// its output.
    pub fn build_assets(&self) -> Result<PathBuf> {
        match ExternalPipeline::from_config(&self.config) {
            Some(pipeline) if self.run_external => pipeline.run(),
            _ => {
                let bundler = AssetBundler::from_config(&self.config);
                let report = bundler.run()?;
                debug!("Asset pipeline finished: {:?}", report);
                Ok(bundler.build_dir().to_path_buf())
            }
        }
    }

    /// Builds the site.
    ///
    /// Content rendering and the asset pipeline run concurrently into a
    /// staging directory next to the output directory. The staging tree
    /// replaces the output directory only when both succeeded.
    pub fn build(&self) -> Result<BuildReport> {
        let output = self.config.output_path();
        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        fs::create_dir_all(&parent)
            .map_err(|e| BlogFlowError::io_error(parent.clone(), e))?;

        let staging = tempfile::Builder::new()
            .prefix(".blogflow-staging-")
            .tempdir_in(&parent)
            .map_err(|e| BlogFlowError::io_error(parent.clone(), e))?;
        info!("Building site into {}", output.display());

        let (rendered, assets) = thread::scope(|scope| {
            let assets = scope.spawn(|| self.build_assets());
            let rendered = self.render_site(staging.path());
            let assets = assets.join().unwrap_or_else(|_| {
                Err(BlogFlowError::internal_error("Asset pipeline panicked"))
            });
            (rendered, assets)
        });

        let mut report = rendered?;
        let asset_dir = assets?;
        report.asset_files = merge_dir(&asset_dir, staging.path())?;

        publish(staging.path(), &output)?;
        report.output = output;
        info!(
            "Built {} post(s), {} listing page(s), {} page(s), {} static and {} asset file(s)",
            report.posts,
            report.listing_pages,
            report.pages,
            report.static_files,
            report.asset_files
        );
        Ok(report)
    }
}

/// Shared context of a document: site values, every post and the page.
fn document_context(
    base: &JsonValue,
    front_matter: &FrontMatter,
    title: Option<&str>,
    url: &str,
) -> JsonValue {
    let mut page = front_matter.to_json();
    page["title"] = json!(title);
    page["url"] = json!(url);

    let mut context = base.clone();
    context["title"] = json!(title);
    context["page"] = page;
    context
}
