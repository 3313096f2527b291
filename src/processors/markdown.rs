// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Markdown Processing Module
//!
//! Renders post and page bodies from Markdown to HTML with
//! `pulldown-cmark`.
//!
//! ## Features
//!
//! - **Fenced code**: always on, highlighted through [`Highlighter`]
//! - **Smart punctuation**: typographic quotes and dashes, on by default
//! - **Extensions**: tables, footnotes and strikethrough, each opt-in
//!
//! ## Example Usage
//!
//! ```rust
//! use blogflow::processors::markdown::MarkdownProcessor;
//! use blogflow::ContentProcessor;
//!
//! let processor = MarkdownProcessor::new()
//!     .with_smart_punctuation(true)
//!     .with_tables(true);
//!
//! let html = processor.process("It's *here*.", None).unwrap();
//! assert_eq!(html, "<p>It’s <em>here</em>.</p>\n");
//! ```

use crate::core::config::{HighlightConfig, MarkdownConfig};
use crate::core::error::{BlogFlowError, Result};
use crate::processors::highlight::{plain_block, Highlighter};
use crate::ContentProcessor;
use pulldown_cmark::{
    html, CodeBlockKind, Event, Options as MarkdownOptions, Parser, Tag,
    TagEnd,
};
use serde_json::Value as JsonValue;

/// Maximum allowed size for Markdown content in bytes (10MB)
const MAX_CONTENT_SIZE: usize = 10 * 1024 * 1024;

/// Markdown to HTML processor.
#[derive(Debug, Clone)]
pub struct MarkdownProcessor {
    options: MarkdownOptions,
    highlighter: Option<Highlighter>,
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownProcessor {
    /// Creates a processor with every extension off and highlighting
    /// disabled.
    pub fn new() -> Self {
        Self {
            options: MarkdownOptions::empty(),
            highlighter: None,
        }
    }

    /// Creates a processor from the site configuration.
    pub fn from_config(
        markdown: &MarkdownConfig,
        highlight: &HighlightConfig,
    ) -> Self {
        let processor = Self::new()
            .with_smart_punctuation(markdown.smartypants)
            .with_tables(markdown.tables)
            .with_footnotes(markdown.footnotes)
            .with_strikethrough(markdown.strikethrough);

        if highlight.enabled {
            processor.with_highlighter(Highlighter::new(
                highlight.start_inline.clone(),
            ))
        } else {
            processor
        }
    }

    fn set_option(mut self, option: MarkdownOptions, enable: bool) -> Self {
        if enable {
            self.options.insert(option);
        } else {
            self.options.remove(option);
        }
        self
    }

    /// Enables typographic quotes, dashes and ellipses.
    pub fn with_smart_punctuation(self, enable: bool) -> Self {
        self.set_option(MarkdownOptions::ENABLE_SMART_PUNCTUATION, enable)
    }

    /// Enables table support in Markdown processing.
    pub fn with_tables(self, enable: bool) -> Self {
        self.set_option(MarkdownOptions::ENABLE_TABLES, enable)
    }

    /// Enables strikethrough support in Markdown processing.
    pub fn with_strikethrough(self, enable: bool) -> Self {
        self.set_option(MarkdownOptions::ENABLE_STRIKETHROUGH, enable)
    }

    /// Enables footnote support in Markdown processing.
    pub fn with_footnotes(self, enable: bool) -> Self {
        self.set_option(MarkdownOptions::ENABLE_FOOTNOTES, enable)
    }

    /// Highlights fenced code blocks with `highlighter`.
    pub fn with_highlighter(mut self, highlighter: Highlighter) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    fn code_block(&self, language: Option<&str>, code: &str) -> Result<String> {
        match &self.highlighter {
            Some(highlighter) => highlighter.render_block(language, code),
            None => Ok(plain_block(language, code)),
        }
    }

    /// Converts Markdown to HTML.
    pub fn render(&self, content: &str) -> Result<String> {
        let mut events = Vec::new();
        let mut code: Option<(Option<String>, String)> = None;

        for event in Parser::new_ext(content, self.options) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some((language, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((language, text)) = code.take() {
                        let block =
                            self.code_block(language.as_deref(), &text)?;
                        events.push(Event::Html(block.into()));
                    }
                }
                Event::Text(text) => match code.as_mut() {
                    Some((_, buffer)) => buffer.push_str(&text),
                    None => events.push(Event::Text(text)),
                },
                other => events.push(other),
            }
        }

        let mut html_output = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        Ok(html_output)
    }
}

impl ContentProcessor for MarkdownProcessor {
    fn process(
        &self,
        content: &str,
        _context: Option<&JsonValue>,
    ) -> Result<String> {
        self.validate(content)?;
        self.render(content)
    }

    fn validate(&self, content: &str) -> Result<()> {
        if content.len() > MAX_CONTENT_SIZE {
            return Err(BlogFlowError::content_processing_error(
                format!(
                    "Content size {} exceeds maximum of {} bytes",
                    content.len(),
                    MAX_CONTENT_SIZE
                ),
                None,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = MarkdownProcessor::new()
            .process("# Title\n\nSome **bold** text.", None)
            .unwrap();
        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>Some <strong>bold</strong> text.</p>\n"
        );
    }

    #[test]
    fn test_smart_punctuation() {
        let smart = MarkdownProcessor::new().with_smart_punctuation(true);
        let html = smart.process("\"Quoted\" -- done...", None).unwrap();
        assert_eq!(html, "<p>“Quoted” – done…</p>\n");

        let plain = MarkdownProcessor::new();
        let html = plain.process("\"Quoted\" -- done", None).unwrap();
        assert!(html.contains("Quoted"));
        assert!(html.contains("--"));
        assert!(!html.contains('“'));
    }

    #[test]
    fn test_fenced_code_without_highlighter() {
        let html = MarkdownProcessor::new()
            .process("```rust\nlet x = 1 < 2;\n```\n", None)
            .unwrap();
        assert_eq!(
            html,
            "<pre><code class=\"language-rust\">let x = 1 &lt; 2;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_fenced_code_is_highlighted() {
        let html = MarkdownProcessor::new()
            .with_highlighter(Highlighter::default())
            .process("Intro\n\n```rust\nfn main() {}\n```\n", None)
            .unwrap();
        assert!(html.starts_with("<p>Intro</p>\n"));
        assert!(html.contains("<pre><code class=\"language-rust\">"));
        assert!(html.contains("<span class=\"source rust\">"));
    }

    #[test]
    fn test_indented_code_is_not_highlighted() {
        let html = MarkdownProcessor::new()
            .with_highlighter(Highlighter::default())
            .process("    plain code\n", None)
            .unwrap();
        assert_eq!(html, "<pre><code>plain code\n</code></pre>\n");
    }

    #[test]
    fn test_extensions_from_config() {
        let markdown = MarkdownConfig {
            smartypants: false,
            tables: true,
            footnotes: false,
            strikethrough: true,
        };
        let highlight = HighlightConfig {
            enabled: false,
            start_inline: Vec::new(),
        };
        let processor = MarkdownProcessor::from_config(&markdown, &highlight);

        let html = processor.process("| a |\n|---|\n| b |\n", None).unwrap();
        assert!(html.contains("<table>"));

        let html = processor.process("~~gone~~", None).unwrap();
        assert_eq!(html, "<p><del>gone</del></p>\n");
    }

    #[test]
    fn test_oversized_content_is_rejected() {
        let content = "a".repeat(MAX_CONTENT_SIZE + 1);
        assert!(MarkdownProcessor::new().validate(&content).is_err());
    }
}
