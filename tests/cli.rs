//! Runs the `kindling` binary against temporary site roots.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn kindling(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kindling"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run kindling")
}

#[test]
fn gen_config_prints_stock_config() {
    let out = kindling(&["gen-config"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("name = \"My Site\""));
    assert!(stdout.contains("[feed]"));
}

#[test]
fn build_writes_site_and_report() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("site");
    fs::create_dir_all(root.join("content")).unwrap();
    fs::write(root.join("config.toml"), "name = \"CLI Site\"\n").unwrap();
    fs::write(root.join("content/hello.md"), "# Hello\n\nFrom the CLI.").unwrap();
    let output = tmp.path().join("build");

    let out = kindling(&[
        "build",
        "--source",
        root.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Article: Hello \u{2192} hello/index.html"));
    assert!(stdout.contains("==> Build complete"));
    assert!(output.join("hello/index.html").is_file());
}

#[test]
fn check_lists_routes_without_writing() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "").unwrap();
    let output = tmp.path().join("build");

    let out = kindling(&[
        "check",
        "--source",
        tmp.path().to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("001 Home     /"));
    assert!(!output.exists());
}

#[test]
fn build_outside_site_root_fails() {
    let tmp = TempDir::new().unwrap();
    let out = kindling(&["build", "--source", tmp.path().to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("error: No config.toml"));
}
