// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Listing Paginator
//!
//! Orders posts newest first and splits them into fixed-size listing pages.
//! Page 1 is published at the listing path (`/` by default); page `n > 1`
//! at the `page_link` pattern below it (`/page/2/`, `/page/3/`, ...).
//!
//! A blog without posts still gets a single, empty first page.

use crate::content::Post;
use crate::core::config::BlogConfig;
use crate::core::traits::ToContext;
use crate::permalink::{expand, join, OutputPath};
use serde_json::{json, Value as JsonValue};
use std::cmp::Ordering;
use std::ops::Range;

/// Sorts posts newest first; posts sharing a date are ordered by slug so
/// the order never depends on the filesystem.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(compare_posts);
}

fn compare_posts(a: &Post, b: &Post) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug))
}

/// One page of the post listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// 1-based page number.
    pub number: usize,
    /// Total number of listing pages.
    pub total_pages: usize,
    /// Indices of this page's posts in the sorted post list.
    pub posts: Range<usize>,
    /// Public URL and output file.
    pub output: OutputPath,
    /// URL of the previous (newer) page.
    pub prev_url: Option<String>,
    /// URL of the next (older) page.
    pub next_url: Option<String>,
}

impl ToContext for ListingPage {
    fn to_context(&self) -> JsonValue {
        json!({
            "page": self.number,
            "total_pages": self.total_pages,
            "url": self.output.url,
            "prev_url": self.prev_url,
            "next_url": self.next_url,
        })
    }
}

/// Splits sorted posts into listing pages.
#[derive(Debug, Clone)]
pub struct Paginator {
    per_page: usize,
    listing_path: String,
    page_link: String,
}

impl Paginator {
    /// Creates a paginator from the blog settings.
    pub fn new(blog: &BlogConfig) -> Self {
        Self {
            per_page: blog.per_page.max(1),
            listing_path: blog.listing_path.clone(),
            page_link: blog.page_link.clone(),
        }
    }

    /// Output location of listing page `number`.
    pub fn output_for(&self, number: usize) -> OutputPath {
        if number <= 1 {
            return OutputPath::for_path(&format!("{}/", self.listing_path), true);
        }
        let num = number.to_string();
        let link = expand(&self.page_link, &[("num", num.as_str())]);
        OutputPath::for_path(
            &format!("{}/", join(&self.listing_path, &link)),
            true,
        )
    }

    /// Splits `post_count` posts into pages.
    pub fn paginate(&self, post_count: usize) -> Vec<ListingPage> {
        let total_pages = post_count.div_ceil(self.per_page).max(1);
        let urls: Vec<OutputPath> =
            (1..=total_pages).map(|n| self.output_for(n)).collect();

        urls.iter()
            .enumerate()
            .map(|(index, output)| {
                let start = index * self.per_page;
                let end = (start + self.per_page).min(post_count);
                ListingPage {
                    number: index + 1,
                    total_pages,
                    posts: start.min(end)..end,
                    output: output.clone(),
                    prev_url: index
                        .checked_sub(1)
                        .map(|prev| urls[prev].url.clone()),
                    next_url: urls.get(index + 1).map(|next| next.url.clone()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn post(name: &str) -> Post {
        Post::from_source(Path::new(name), "---\n---\nbody\n", "post/{title}", true)
            .unwrap()
    }

    #[test]
    fn test_sort_newest_first_then_slug() {
        let mut posts = vec![
            post("2015-01-01-old.html.md"),
            post("2015-06-01-zeta.html.md"),
            post("2015-06-01-alpha.html.md"),
        ];
        sort_posts(&mut posts);
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["alpha", "zeta", "old"]);
    }

    #[test]
    fn test_seven_posts_make_two_pages() {
        let paginator = Paginator::new(&BlogConfig::default());
        let pages = paginator.paginate(7);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].posts, 0..5);
        assert_eq!(pages[0].output.url, "/");
        assert_eq!(pages[0].prev_url, None);
        assert_eq!(pages[0].next_url.as_deref(), Some("/page/2/"));

        assert_eq!(pages[1].posts, 5..7);
        assert_eq!(pages[1].output.url, "/page/2/");
        assert_eq!(
            pages[1].output.file,
            Path::new("page/2/index.html").to_path_buf()
        );
        assert_eq!(pages[1].prev_url.as_deref(), Some("/"));
        assert_eq!(pages[1].next_url, None);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_page() {
        let pages = Paginator::new(&BlogConfig::default()).paginate(10);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].posts, 5..10);
    }

    #[test]
    fn test_zero_posts_yield_one_empty_page() {
        let pages = Paginator::new(&BlogConfig::default()).paginate(0);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].posts.is_empty());
        assert_eq!(pages[0].output.url, "/");
        assert_eq!(pages[0].total_pages, 1);
    }

    #[test]
    fn test_nested_listing_path() {
        let blog = BlogConfig {
            listing_path: "/blog".to_string(),
            per_page: 2,
            ..Default::default()
        };
        let paginator = Paginator::new(&blog);
        assert_eq!(paginator.output_for(1).url, "/blog/");
        assert_eq!(paginator.output_for(3).url, "/blog/page/3/");
    }

    #[test]
    fn test_listing_context() {
        let pages = Paginator::new(&BlogConfig::default()).paginate(6);
        let context = pages[1].to_context();
        assert_eq!(context["page"], 2);
        assert_eq!(context["total_pages"], 2);
        assert_eq!(context["prev_url"], "/");
        assert!(context["next_url"].is_null());
    }
}
