// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Content Processors Module
//!
//! Processors turn source bodies into HTML. Each processor implements the
//! [`ContentProcessor`](crate::ContentProcessor) trait so the build
//! pipeline can swap implementations.
//!
//! ## Available Processors
//!
//! - [`markdown`]: Markdown with smart punctuation and extensions
//! - [`highlight`]: class-based syntax highlighting for code blocks
//!
//! ## Implementing Custom Processors
//!
//! ```rust
//! # use blogflow::core::error::Result;
//! # use blogflow::ContentProcessor;
//! # use serde_json::Value;
//! #[derive(Debug)]
//! struct ShoutingProcessor;
//!
//! impl ContentProcessor for ShoutingProcessor {
//!     fn process(&self, content: &str, _context: Option<&Value>) -> Result<String> {
//!         Ok(format!("<p>{}</p>", content.to_uppercase()))
//!     }
//!
//!     fn validate(&self, _content: &str) -> Result<()> {
//!         Ok(())
//!     }
//! }
//! ```

/// Syntax highlighting for fenced code blocks.
pub mod highlight;

/// Markdown processing functionality.
pub mod markdown;

// Re-export commonly used types
pub use highlight::Highlighter;
pub use markdown::MarkdownProcessor;
