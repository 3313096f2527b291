// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Permalinks and Output Paths
//!
//! Computes where every document is published:
//!
//! - [`slugify`] turns a title into a URL segment.
//! - [`expand`] substitutes `{placeholder}` values into a pattern such as
//!   `post/{title}`.
//! - [`OutputPath::for_path`] maps a site path to its public URL and to the
//!   file written under the output directory, honouring directory indexes.
//!
//! ```rust
//! use blogflow::permalink::{expand, slugify, OutputPath};
//!
//! let slug = slugify("Hello World");
//! let path = expand("post/{title}", &[("title", slug.as_str())]);
//! assert_eq!(path, "post/hello-world");
//!
//! let output = OutputPath::for_path(&path, true);
//! assert_eq!(output.url, "/post/hello-world/");
//! assert_eq!(output.file.to_str(), Some("post/hello-world/index.html"));
//! ```

use std::path::PathBuf;

/// File name served for directory-style URLs.
pub const INDEX_FILE: &str = "index.html";

/// Converts text to a URL-safe slug.
///
/// Non-ASCII characters are transliterated, letters are lowercased, every
/// run of other characters becomes a single `-`, and leading or trailing
/// dashes are dropped. `"Hello, World!"` becomes `hello-world`.
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// Substitutes `{name}` placeholders in `pattern`.
///
/// Placeholders without a value are left untouched.
pub fn expand(pattern: &str, values: &[(&str, &str)]) -> String {
    let mut expanded = pattern.to_string();
    for (name, value) in values {
        expanded = expanded.replace(&format!("{{{}}}", name), value);
    }
    expanded
}

/// Joins path segments into a single site path, dropping empty segments
/// and duplicate slashes. A trailing slash on the last segment is kept.
pub fn join(base: &str, path: &str) -> String {
    let trailing = path.ends_with('/')
        || (path.trim_matches('/').is_empty() && base.ends_with('/'));
    let joined = base
        .split('/')
        .chain(path.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if trailing && !joined.is_empty() {
        format!("{}/", joined)
    } else {
        joined
    }
}

/// Public URL and output file of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputPath {
    /// URL the document is served at, always starting with `/`.
    pub url: String,
    /// File written relative to the output directory.
    pub file: PathBuf,
}

impl OutputPath {
    /// Maps a site path to its URL and output file.
    ///
    /// | path | directory indexes | url | file |
    /// |------|-------------------|-----|------|
    /// | `/` | any | `/` | `index.html` |
    /// | `post/hello` | on | `/post/hello/` | `post/hello/index.html` |
    /// | `post/hello` | off | `/post/hello.html` | `post/hello.html` |
    /// | `about.html` | on | `/about/` | `about/index.html` |
    /// | `feed.xml` | any | `/feed.xml` | `feed.xml` |
    pub fn for_path(path: &str, directory_indexes: bool) -> Self {
        let trimmed = path.trim_start_matches('/');

        if trimmed.is_empty() {
            return Self::directory("");
        }
        if trimmed.ends_with('/') {
            return Self::directory(trimmed.trim_end_matches('/'));
        }

        let (parent, name) = match trimmed.rsplit_once('/') {
            Some((parent, name)) => (parent, name),
            None => ("", trimmed),
        };

        if name == INDEX_FILE {
            return Self::directory(parent);
        }

        match name.rsplit_once('.') {
            Some((stem, "html")) if directory_indexes => {
                Self::directory(&join(parent, stem))
            }
            Some(_) => Self::file(trimmed),
            None if directory_indexes => Self::directory(trimmed),
            None => Self::file(&format!("{}.html", trimmed)),
        }
    }

    fn directory(dir: &str) -> Self {
        if dir.is_empty() {
            return Self {
                url: "/".to_string(),
                file: PathBuf::from(INDEX_FILE),
            };
        }
        Self {
            url: format!("/{}/", dir),
            file: PathBuf::from(dir).join(INDEX_FILE),
        }
    }

    fn file(path: &str) -> Self {
        Self {
            url: format!("/{}", path),
            file: PathBuf::from(path),
        }
    }

    /// Whether the output is an HTML document.
    pub fn is_html(&self) -> bool {
        self.file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_rules() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust: the -- good parts!  "), "rust-the-good-parts");
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_expand_substitutes_placeholders() {
        let path = expand(
            "{year}/{month}/{day}/{title}",
            &[
                ("year", "2015"),
                ("month", "03"),
                ("day", "07"),
                ("title", "hello"),
            ],
        );
        assert_eq!(path, "2015/03/07/hello");
        assert_eq!(expand("post/{title}", &[]), "post/{title}");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "page/2"), "page/2");
        assert_eq!(join("blog/", "/page/2/"), "blog/page/2/");
        assert_eq!(join("", ""), "");
        assert_eq!(join("blog/", ""), "blog/");
    }

    #[test]
    fn test_root_maps_to_index() {
        let output = OutputPath::for_path("/", true);
        assert_eq!(output.url, "/");
        assert_eq!(output.file, PathBuf::from("index.html"));

        let output = OutputPath::for_path("index.html", true);
        assert_eq!(output.url, "/");
    }

    #[test]
    fn test_directory_indexes() {
        let output = OutputPath::for_path("post/hello-world", true);
        assert_eq!(output.url, "/post/hello-world/");
        assert_eq!(output.file, PathBuf::from("post/hello-world/index.html"));

        let output = OutputPath::for_path("about.html", true);
        assert_eq!(output.url, "/about/");
        assert_eq!(output.file, PathBuf::from("about/index.html"));

        let output = OutputPath::for_path("page/2/", true);
        assert_eq!(output.url, "/page/2/");
        assert_eq!(output.file, PathBuf::from("page/2/index.html"));
    }

    #[test]
    fn test_without_directory_indexes() {
        let output = OutputPath::for_path("post/hello-world", false);
        assert_eq!(output.url, "/post/hello-world.html");
        assert_eq!(output.file, PathBuf::from("post/hello-world.html"));

        let output = OutputPath::for_path("about.html", false);
        assert_eq!(output.url, "/about.html");
    }

    #[test]
    fn test_non_html_files_keep_their_name() {
        for path in ["feed.xml", "/data/posts.json", "robots.txt"] {
            let output = OutputPath::for_path(path, true);
            assert_eq!(output.url, format!("/{}", path.trim_start_matches('/')));
            assert!(!output.is_html());
        }
        assert!(OutputPath::for_path("about.html", true).is_html());
    }
}
