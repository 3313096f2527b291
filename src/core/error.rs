// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Error Handling for BlogFlow
//!
//! This module defines the error type shared by every stage of the BlogFlow
//! build pipeline. The `thiserror` crate is used to keep variants
//! descriptive while still carrying the underlying source error.
//!
//! Every failure is build-time and developer-facing, so variants carry the
//! path, template or command that caused them.

use std::path::PathBuf;
use thiserror::Error;

/// A unified result type for the BlogFlow library.
pub type Result<T> = std::result::Result<T, BlogFlowError>;

/// Boxed source error attached to several variants.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for BlogFlow, encompassing all potential error cases.
#[derive(Error, Debug)]
pub enum BlogFlowError {
    /// Error related to configuration loading or validation.
    #[error("Configuration error: {message}.")]
    ConfigError {
        /// Detailed description of the configuration error.
        message: String,
        /// Optional path of the file or directory that caused the error.
        path: Option<PathBuf>,
    },

    /// Error encountered while parsing or rendering content.
    #[error("Content processing error: {message}.")]
    ContentProcessingError {
        /// Detailed description of the content processing error.
        message: String,
        /// Optional source error providing additional context.
        #[source]
        source: Option<BoxedSource>,
    },

    /// A post source file that cannot be turned into a post.
    ///
    /// Raised for filenames that do not follow the
    /// `{year}-{month}-{day}-{title}` convention, impossible dates and
    /// posts without front matter.
    #[error("Invalid post `{}`: {message}.", .path.display())]
    InvalidPost {
        /// Path of the offending source file.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// Error in output generation.
    #[error("Output generation error: {message} at {path:?}.")]
    OutputGenerationError {
        /// Description of the output generation error.
        message: String,
        /// Path associated with the error.
        path: PathBuf,
        /// Optional source error providing additional context.
        #[source]
        source: Option<BoxedSource>,
    },

    /// Error related to template rendering, including undefined layouts.
    #[error(
        "Template rendering error: {message} in template `{template}`."
    )]
    TemplateRenderingError {
        /// Description of the template rendering error.
        message: String,
        /// The template associated with the error.
        template: String,
        /// Optional source error providing additional context.
        #[source]
        source: Option<BoxedSource>,
    },

    /// Asset bundling or vendor copying failed.
    #[error("Asset error: {message} (`{}`).", .path.display())]
    AssetError {
        /// Description of the asset failure.
        message: String,
        /// The missing or unreadable path.
        path: PathBuf,
    },

    /// The external asset pipeline could not be run or exited unsuccessfully.
    #[error("External pipeline `{name}` failed: {message}.")]
    ExternalPipelineError {
        /// Name of the pipeline (for example `gulp`).
        name: String,
        /// Description of the failure.
        message: String,
        /// Exit code, when the process ran to completion.
        code: Option<i32>,
    },

    /// IO error encountered during file operations.
    #[error("File IO error at `{path:?}`: {source}")]
    IOError {
        /// Path associated with the IO error.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// General internal error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for BlogFlowError {
    /// Converts a standard IO error into a `BlogFlowError::IOError` with an
    /// empty path.
    fn from(source: std::io::Error) -> Self {
        BlogFlowError::IOError {
            path: PathBuf::new(),
            source,
        }
    }
}

impl BlogFlowError {
    /// Creates a `ConfigError` with a specific message.
    pub fn config_error<S: Into<String>>(
        message: S,
        path: Option<PathBuf>,
    ) -> Self {
        BlogFlowError::ConfigError {
            message: message.into(),
            path,
        }
    }

    /// Creates a `ContentProcessingError` with a specific message and optional source.
    pub fn content_processing_error<S: Into<String>>(
        message: S,
        source: Option<BoxedSource>,
    ) -> Self {
        BlogFlowError::ContentProcessingError {
            message: message.into(),
            source,
        }
    }

    /// Creates an `InvalidPost` error for the given source file.
    pub fn invalid_post<S: Into<String>>(path: PathBuf, message: S) -> Self {
        BlogFlowError::InvalidPost {
            path,
            message: message.into(),
        }
    }

    /// Creates an `OutputGenerationError` with a specific message, path, and optional source.
    pub fn output_generation_error<S: Into<String>>(
        message: S,
        path: PathBuf,
        source: Option<BoxedSource>,
    ) -> Self {
        BlogFlowError::OutputGenerationError {
            message: message.into(),
            path,
            source,
        }
    }

    /// Creates a `TemplateRenderingError` with a message, template name, and optional source.
    pub fn template_rendering_error<S: Into<String>>(
        message: S,
        template: String,
        source: Option<BoxedSource>,
    ) -> Self {
        BlogFlowError::TemplateRenderingError {
            message: message.into(),
            template,
            source,
        }
    }

    /// Creates an `AssetError` naming the offending path.
    pub fn asset_error<S: Into<String>>(message: S, path: PathBuf) -> Self {
        BlogFlowError::AssetError {
            message: message.into(),
            path,
        }
    }

    /// Creates an `ExternalPipelineError`.
    pub fn external_pipeline_error<N, S>(
        name: N,
        message: S,
        code: Option<i32>,
    ) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        BlogFlowError::ExternalPipelineError {
            name: name.into(),
            message: message.into(),
            code,
        }
    }

    /// Wraps an IO error as an `IOError` variant with the specified path.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        BlogFlowError::IOError { path, source }
    }

    /// Creates a general internal error with a custom message.
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        BlogFlowError::InternalError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_post_names_the_file() {
        let err = BlogFlowError::invalid_post(
            PathBuf::from("source/posts/hello.html.md"),
            "filename does not match `{year}-{month}-{day}-{title}`",
        );
        let message = err.to_string();
        assert!(message.contains("source/posts/hello.html.md"));
        assert!(message.contains("{year}-{month}-{day}-{title}"));
    }

    #[test]
    fn test_asset_error_names_the_path() {
        let err = BlogFlowError::asset_error(
            "Vendor source not found",
            PathBuf::from("node_modules/jquery/dist/jquery.js"),
        );
        assert!(err
            .to_string()
            .contains("node_modules/jquery/dist/jquery.js"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BlogFlowError = io.into();
        assert!(matches!(err, BlogFlowError::IOError { .. }));
    }

    #[test]
    fn test_external_pipeline_error_keeps_code() {
        let err = BlogFlowError::external_pipeline_error(
            "gulp",
            "exited with status 2",
            Some(2),
        );
        match err {
            BlogFlowError::ExternalPipelineError { name, code, .. } => {
                assert_eq!(name, "gulp");
                assert_eq!(code, Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
