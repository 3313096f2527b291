// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Syntax Highlighting
//!
//! Highlights fenced code blocks with `syntect`, emitting class-based markup
//! (`<span class="source php">…`) so the site's stylesheet picks the colours.
//!
//! Languages listed as *start inline* are highlighted as if the sample were
//! already inside the language's code section. A PHP sample therefore does
//! not need an opening `<?php` tag.

use crate::core::error::{BlogFlowError, Result};
use handlebars::html_escape;
use std::sync::OnceLock;
use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Wraps already-rendered code in `<pre><code>`.
fn wrap(language: Option<&str>, inner: &str) -> String {
    match language {
        Some(lang) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            html_escape(lang),
            inner
        ),
        None => format!("<pre><code>{}</code></pre>\n", inner),
    }
}

/// Renders a code block without highlighting.
pub fn plain_block(language: Option<&str>, code: &str) -> String {
    wrap(language, &html_escape(code))
}

/// Class-based syntax highlighter for fenced code blocks.
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    start_inline: Vec<String>,
}

impl Highlighter {
    /// Creates a highlighter; `start_inline` names languages whose samples
    /// begin inside code.
    pub fn new(start_inline: Vec<String>) -> Self {
        Self {
            start_inline: start_inline
                .into_iter()
                .map(|lang| lang.to_lowercase())
                .collect(),
        }
    }

    /// Whether `language` is highlighted in start-inline mode.
    pub fn starts_inline(&self, language: &str) -> bool {
        let language = language.to_lowercase();
        self.start_inline.iter().any(|lang| *lang == language)
    }

    fn find_syntax(&self, language: &str) -> &'static SyntaxReference {
        let ss = syntax_set();

        if self.starts_inline(language) {
            let inline = ss
                .find_syntax_by_token(language)
                .and_then(|syntax| {
                    ss.find_syntax_by_name(&format!("{} Source", syntax.name))
                });
            if let Some(syntax) = inline {
                return syntax;
            }
        }

        ss.find_syntax_by_token(language)
            .or_else(|| ss.find_syntax_by_name(language))
            .or_else(|| ss.find_syntax_by_extension(language))
            .unwrap_or_else(|| ss.find_syntax_plain_text())
    }

    /// Highlights `code` and returns the inner HTML of the code element.
    pub fn highlight(&self, language: &str, code: &str) -> Result<String> {
        let ss = syntax_set();
        let syntax = self.find_syntax(language);
        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            ss,
            ClassStyle::Spaced,
        );
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| {
                    BlogFlowError::content_processing_error(
                        format!("Failed to highlight `{}` code", language),
                        Some(Box::new(e)),
                    )
                })?;
        }
        Ok(generator.finalize())
    }

    /// Renders a complete `<pre><code>` block, highlighting it when the
    /// language is known.
    pub fn render_block(
        &self,
        language: Option<&str>,
        code: &str,
    ) -> Result<String> {
        match language {
            Some(lang) => Ok(wrap(Some(lang), &self.highlight(lang, code)?)),
            None => Ok(plain_block(None, code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_block_escapes_markup() {
        assert_eq!(
            plain_block(Some("html"), "<a href=\"x\">&</a>"),
            "<pre><code class=\"language-html\">&lt;a href&#x3D;&quot;x&quot;&gt;&amp;&lt;/a&gt;</code></pre>\n"
        );
    }

    #[test]
    fn test_plain_block() {
        assert_eq!(
            plain_block(Some("rust"), "a < b\n"),
            "<pre><code class=\"language-rust\">a &lt; b\n</code></pre>\n"
        );
        assert_eq!(plain_block(None, "x"), "<pre><code>x</code></pre>\n");
    }

    #[test]
    fn test_highlight_emits_classes() {
        let highlighter = Highlighter::default();
        let html = highlighter
            .render_block(Some("rust"), "fn main() {}\n")
            .unwrap();
        assert!(html.starts_with("<pre><code class=\"language-rust\">"));
        assert!(html.contains("<span class=\"source rust\">"));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_php_starts_inline() {
        let highlighter = Highlighter::new(vec!["PHP".to_string()]);
        assert!(highlighter.starts_inline("php"));

        let html = highlighter.highlight("php", "$x = 1;\n").unwrap();
        assert!(html.contains("variable"));

        let html = Highlighter::default().highlight("php", "$x = 1;\n").unwrap();
        assert!(!html.contains("variable"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text() {
        let html = Highlighter::default()
            .render_block(Some("no-such-lang"), "a < b\n")
            .unwrap();
        assert!(html.contains("a &lt; b"));
        assert!(html.contains("language-no-such-lang"));
    }
}
