//! Tests for the `blogflow` binary.

use assert_cmd::Command;
use blogflow::process::copy_dir_all;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn demo_site() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/blog");
    _ = copy_dir_all(&demo, temp_dir.path()).unwrap();
    for dir in ["build", ".tmp"] {
        _ = fs::remove_dir_all(temp_dir.path().join(dir));
    }
    temp_dir
}

fn config_path(site: &TempDir) -> PathBuf {
    site.path().join("blogflow.toml")
}

fn blogflow() -> Command {
    let mut command = Command::cargo_bin("blogflow").unwrap();
    _ = command.env_remove("RUST_LOG");
    command
}

fn append_config(site: &TempDir, extra: &str) {
    let path = config_path(site);
    let mut config = fs::read_to_string(&path).unwrap();
    config.push_str(extra);
    fs::write(path, config).unwrap();
}

#[test]
fn test_no_arguments_prints_help() {
    _ = blogflow()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_build_writes_the_site() {
    let site = demo_site();
    _ = blogflow()
        .arg("build")
        .arg("--config")
        .arg(config_path(&site))
        .assert()
        .success();

    let build = site.path().join("build");
    assert!(build.join("index.html").is_file());
    assert!(build.join("page/2/index.html").is_file());
    assert!(build.join("post/hello-world/index.html").is_file());
    assert!(build.join("javascripts/all.js").is_file());
    assert!(build.join("fonts/fontawesome-webfont.woff").is_file());
}

#[test]
fn test_build_output_override_and_minify() {
    let site = demo_site();
    let plain = site.path().join("plain");
    let small = site.path().join("small");

    _ = blogflow()
        .args(["build", "--config"])
        .arg(config_path(&site))
        .arg("--output")
        .arg(&plain)
        .assert()
        .success();
    _ = blogflow()
        .args(["build", "--config"])
        .arg(config_path(&site))
        .arg("--output")
        .arg(&small)
        .arg("--minify")
        .assert()
        .success();

    let plain_index = fs::read(plain.join("index.html")).unwrap();
    let small_index = fs::read(small.join("index.html")).unwrap();
    assert!(small_index.len() < plain_index.len());
    // Only HTML is minified.
    assert_eq!(
        fs::read(plain.join("feed.xml")).unwrap(),
        fs::read(small.join("feed.xml")).unwrap()
    );
    assert!(!site.path().join("build").exists());
}

#[test]
fn test_build_with_profile() {
    let site = demo_site();
    _ = blogflow()
        .args(["build", "--profile", "production", "--config"])
        .arg(config_path(&site))
        .assert()
        .success();

    let index =
        fs::read_to_string(site.path().join("build/index.html")).unwrap();
    assert!(index.contains("landing production"));
}

#[test]
fn test_routes_command_lists_layouts() {
    let site = demo_site();
    _ = blogflow()
        .args(["routes", "--config"])
        .arg(config_path(&site))
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^/\s+landing$").unwrap())
        .stdout(predicate::str::is_match(r"(?m)^/post/hello-world/\s+post$").unwrap())
        .stdout(predicate::str::is_match(r"(?m)^/feed\.xml\s+\(none\)$").unwrap())
        .stdout(predicate::str::is_match(r"(?m)^/page/2/\s+layout$").unwrap());

    assert!(!site.path().join("build").exists());
}

#[test]
fn test_assets_command_runs_builtin_bundler() {
    let site = demo_site();
    _ = blogflow()
        .args(["assets", "--config"])
        .arg(config_path(&site))
        .assert()
        .success();

    let dist = site.path().join(".tmp/dist");
    let bundle = fs::read_to_string(dist.join("javascripts/all.js")).unwrap();
    assert!(bundle.starts_with("/* assets/javascripts/lib/dom.js */"));
    assert_eq!(
        fs::read(dist.join("fonts/fontawesome-webfont.ttf")).unwrap(),
        fs::read(site.path().join("vendor/font-awesome/fonts/fontawesome-webfont.ttf"))
            .unwrap()
    );
    assert!(!site.path().join("build").exists());
}

#[cfg(unix)]
#[test]
fn test_failed_external_pipeline_publishes_nothing() {
    let site = demo_site();
    append_config(
        &site,
        "\n[external]\nname = \"gulp\"\ncommand = [\"sh\", \"-c\", \"echo 'gulp task failed' >&2; exit 2\"]\n",
    );

    _ = blogflow()
        .args(["build", "--config"])
        .arg(config_path(&site))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("exited with status 2"))
        .stderr(predicate::str::contains("gulp task failed"));

    assert!(!site.path().join("build").exists());
}

#[cfg(unix)]
#[test]
fn test_external_pipeline_output_is_merged() {
    let site = demo_site();
    append_config(
        &site,
        "\n[external]\nname = \"gulp\"\ncommand = [\"sh\", \"-c\", \"mkdir -p .tmp/dist/stylesheets && echo 'body{}' > .tmp/dist/stylesheets/site.css\"]\nsource = \".tmp/dist\"\n",
    );

    _ = blogflow()
        .args(["build", "--config"])
        .arg(config_path(&site))
        .assert()
        .success();

    let build = site.path().join("build");
    assert_eq!(
        fs::read_to_string(build.join("stylesheets/site.css")).unwrap(),
        "body{}\n"
    );
    // The built-in bundler did not run.
    assert!(!build.join("javascripts/all.js").exists());
}

#[test]
fn test_no_external_falls_back_to_builtin_bundler() {
    let site = demo_site();
    append_config(
        &site,
        "\n[external]\nname = \"gulp\"\ncommand = [\"blogflow-no-such-program\"]\n",
    );

    _ = blogflow()
        .args(["build", "--no-external", "--config"])
        .arg(config_path(&site))
        .assert()
        .success();

    assert!(site.path().join("build/javascripts/all.js").is_file());
}

#[test]
fn test_malformed_post_filename_exits_non_zero() {
    let site = demo_site();
    fs::write(
        site.path().join("source/posts/2015-13-01-month-thirteen.html.md"),
        "---\ntitle: Month Thirteen\n---\n",
    )
    .unwrap();

    _ = blogflow()
        .args(["build", "--config"])
        .arg(config_path(&site))
        .assert()
        .failure()
        .stderr(predicate::str::contains("2015-13-01-month-thirteen.html.md"));

    assert!(!site.path().join("build").exists());
}

#[test]
fn test_missing_vendor_file_fails_the_build() {
    let site = demo_site();
    fs::remove_file(site.path().join("vendor/bootstrap/js/collapse.js")).unwrap();

    _ = blogflow()
        .args(["build", "--config"])
        .arg(config_path(&site))
        .assert()
        .failure()
        .stderr(predicate::str::contains("collapse.js"));

    assert!(!site.path().join("build").exists());
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("blogflow.toml");

    _ = blogflow()
        .args(["routes", "--config"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to list routes"))
        .stderr(predicate::str::contains("caused by"));
}

#[test]
fn test_verbose_flag_enables_logging() {
    let site = demo_site();
    _ = blogflow()
        .args(["-v", "build", "--config"])
        .arg(config_path(&site))
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO"));
}
