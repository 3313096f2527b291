//! End-to-end builds of the demo blog through the library.

use blogflow::core::config::{ConfigBuilder, Profile};
use blogflow::process::{copy_dir_all, list_files};
use blogflow::{BlogFlow, BlogFlowError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Copies `demos/blog` into a fresh directory.
fn demo_site() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/blog");
    _ = copy_dir_all(&demo, temp_dir.path()).unwrap();
    // Leftovers from building the demo in place.
    for dir in ["build", ".tmp"] {
        _ = fs::remove_dir_all(temp_dir.path().join(dir));
    }
    temp_dir
}

fn pipeline(root: &Path) -> Result<BlogFlow> {
    let config = ConfigBuilder::new()
        .with_file(root.join("blogflow.toml"))
        .build()?;
    BlogFlow::from_config(config)
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path))
        .unwrap_or_else(|e| panic!("{}: {}", path, e))
}

/// Post URLs linked from a listing page, in order.
fn listed_urls(html: &str) -> Vec<String> {
    html.split("<li><a href=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_string)
        .collect()
}

fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    list_files(dir)
        .unwrap()
        .into_iter()
        .map(|(path, relative)| (relative, fs::read(path).unwrap()))
        .collect()
}

#[test]
fn test_seven_posts_make_two_listing_pages() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    let report = pipeline(root)?.build()?;

    assert_eq!(report.posts, 7);
    assert_eq!(report.listing_pages, 2);

    let first = listed_urls(&read(root, "build/index.html"));
    let second = listed_urls(&read(root, "build/page/2/index.html"));
    assert_eq!(
        first,
        vec![
            "/post/spring-cleaning/",
            "/post/shell-one-liners/",
            "/post/no-layout-experiment/",
            "/post/ownership-notes/",
            "/post/reading-list/",
        ]
    );
    assert_eq!(
        second,
        vec!["/post/a-tiny-php-router/", "/post/hello-world/"]
    );
    assert!(!root.join("build/page/3").exists());

    let first_page = read(root, "build/index.html");
    assert!(first_page.contains("href=\"/page/2/\""));
    assert!(first_page.contains("Page 1 of 2"));
    let second_page = read(root, "build/page/2/index.html");
    assert!(second_page.contains("rel=\"prev\" href=\"/\""));
    assert!(!second_page.contains("rel=\"next\""));
    Ok(())
}

#[test]
fn test_build_is_deterministic() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    let flow = pipeline(root)?;

    _ = flow.build()?;
    let first = snapshot(&root.join("build"));
    _ = flow.build()?;
    let second = snapshot(&root.join("build"));

    assert!(!first.is_empty());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_data_routes_have_no_layout() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    _ = pipeline(root)?.build()?;

    let feed = read(root, "build/feed.xml");
    assert!(feed.starts_with("<?xml"));
    assert!(feed.contains("<link href=\"https://example.com/post/hello-world/\"/>"));

    let json = read(root, "build/posts.json");
    let robots = read(root, "build/robots.txt");
    for output in [&feed, &json, &robots] {
        assert!(!output.contains("<html"));
        assert!(!output.contains("<nav"));
    }

    let posts: serde_json::Value = serde_json::from_str(&json).unwrap();
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 7);
    assert_eq!(posts[0]["title"], "Spring Cleaning");
    assert_eq!(posts[6]["date"], "2015-01-04");

    assert_eq!(robots, read(root, "source/robots.txt"));
    Ok(())
}

#[test]
fn test_root_uses_landing_layout() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    _ = pipeline(root)?.build()?;

    let index = read(root, "build/index.html");
    assert!(index.contains("<body class=\"landing development\">"));
    assert!(index.contains("<h1>Field Notes</h1>"));

    let second = read(root, "build/page/2/index.html");
    assert!(second.contains("<body class=\"development\">"));
    assert!(second.contains("<title>Page 2 | Field Notes</title>"));

    let about = read(root, "build/about/index.html");
    assert!(about.contains("<title>About | Field Notes</title>"));
    Ok(())
}

#[test]
fn test_posts_render_with_post_layout() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    _ = pipeline(root)?.build()?;

    let hello = read(root, "build/post/hello-world/index.html");
    assert!(hello.contains("<body class=\"post development\">"));
    assert!(hello.contains("<h1>Hello World</h1>"));
    assert!(hello.contains("January 4, 2015"));
    assert!(hello.contains("\u{201c}short\u{201d}"));
    assert!(hello.contains('\u{2013}'));
    assert!(hello.contains("<li>meta</li>"));

    let php = read(root, "build/post/a-tiny-php-router/index.html");
    assert!(php.contains("<pre><code class=\"language-php\">"));
    assert!(php.contains("<span class=\""));

    let table = read(root, "build/post/reading-list/index.html");
    assert!(table.contains("<table>"));

    let bare = read(root, "build/post/no-layout-experiment/index.html");
    assert!(bare.contains("without a wrapper"));
    assert!(!bare.contains("<html"));
    Ok(())
}

#[test]
fn test_assets_are_bundled_and_vendored() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    let report = pipeline(root)?.build()?;
    assert_eq!(report.asset_files, 5);

    for (source, destination) in [
        ("vendor/jquery/dist/jquery.js", "build/javascripts/jquery.js"),
        (
            "vendor/bootstrap/js/collapse.js",
            "build/javascripts/bootstrap/collapse.js",
        ),
        (
            "vendor/font-awesome/fonts/fontawesome-webfont.woff",
            "build/fonts/fontawesome-webfont.woff",
        ),
        (
            "vendor/font-awesome/fonts/fontawesome-webfont.ttf",
            "build/fonts/fontawesome-webfont.ttf",
        ),
    ] {
        assert_eq!(
            fs::read(root.join(destination))?,
            fs::read(root.join(source))?,
            "{} differs from {}",
            destination,
            source
        );
    }

    let bundle = read(root, "build/javascripts/all.js");
    let banners: Vec<&str> =
        bundle.lines().filter(|l| l.starts_with("/* ")).collect();
    assert_eq!(
        banners,
        vec![
            "/* assets/javascripts/lib/dom.js */",
            "/* assets/javascripts/lib/analytics-off.js */",
            "/* assets/javascripts/menu/index.js */",
            "/* assets/javascripts/all.js */",
        ]
    );
    assert!(!bundle.contains("import "));
    assert!(!bundle.contains("require("));
    assert_eq!(bundle.matches("function ready(").count(), 1);

    assert_eq!(
        fs::read(root.join("build/images/pixel.gif"))?,
        fs::read(root.join("source/images/pixel.gif"))?
    );
    Ok(())
}

#[test]
fn test_routes_resolve_layouts() -> Result<()> {
    let site = demo_site();
    let routes = pipeline(site.path())?.routes()?;
    assert_eq!(routes.len(), 14);

    let layout = |url: &str| {
        routes
            .iter()
            .find(|r| r.url == url)
            .unwrap_or_else(|| panic!("no route {}", url))
            .layout
            .clone()
    };
    assert_eq!(layout("/").as_deref(), Some("landing"));
    assert_eq!(layout("/page/2/").as_deref(), Some("layout"));
    assert_eq!(layout("/post/hello-world/").as_deref(), Some("post"));
    assert_eq!(layout("/post/no-layout-experiment/"), None);
    assert_eq!(layout("/about/").as_deref(), Some("layout"));
    assert_eq!(layout("/feed.xml"), None);
    assert_eq!(layout("/posts.json"), None);
    assert_eq!(layout("/robots.txt"), None);

    // Nothing is written.
    assert!(!site.path().join("build").exists());
    Ok(())
}

#[test]
fn test_malformed_post_fails_and_keeps_output() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    _ = pipeline(root)?.build()?;
    let published = read(root, "build/index.html");

    let bad = root.join("source/posts/2015-02-30-leap-day.html.md");
    fs::write(&bad, "---\ntitle: Leap Day\n---\nNope.\n")?;

    match pipeline(root)?.build() {
        Err(BlogFlowError::InvalidPost { path, .. }) => assert_eq!(path, bad),
        other => panic!("expected an invalid post, got {:?}", other.map(|_| ())),
    }
    assert_eq!(read(root, "build/index.html"), published);
    Ok(())
}

#[test]
fn test_post_without_date_prefix_is_rejected() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    let bad = root.join("source/posts/hello-again.html.md");
    fs::write(&bad, "---\ntitle: Hello Again\n---\n")?;

    let err = pipeline(root)?.routes().unwrap_err();
    assert!(err.to_string().contains("hello-again.html.md"));
    Ok(())
}

#[test]
fn test_zero_posts_render_one_empty_listing() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    for (path, _) in list_files(&root.join("source/posts"))? {
        fs::remove_file(path)?;
    }

    let report = pipeline(root)?.build()?;
    assert_eq!(report.posts, 0);
    assert_eq!(report.listing_pages, 1);

    let index = read(root, "build/index.html");
    assert!(listed_urls(&index).is_empty());
    assert!(index.contains("Page 1 of 1"));
    assert!(!root.join("build/page").exists());
    Ok(())
}

#[test]
fn test_unknown_layout_fails_the_build() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    fs::write(
        root.join("source/posts/2015-03-20-odd-one-out.html.md"),
        "---\ntitle: Odd One Out\nlayout: gallery\n---\nBody.\n",
    )?;

    let result = pipeline(root)?.build();
    assert!(matches!(
        result,
        Err(BlogFlowError::TemplateRenderingError { ref template, .. }) if template == "gallery"
    ));
    assert!(!root.join("build").exists());
    Ok(())
}

#[test]
fn test_profile_is_exposed_to_templates() -> Result<()> {
    let site = demo_site();
    let root = site.path();
    let config = ConfigBuilder::new()
        .with_file(root.join("blogflow.toml"))
        .with_profile(Profile::Production)
        .build()?;
    _ = BlogFlow::from_config(config)?.build()?;

    assert!(read(root, "build/index.html")
        .contains("<body class=\"landing production\">"));
    Ok(())
}
