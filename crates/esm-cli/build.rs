//! Stamps the binary with its git version and build target.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let version = describe().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=ESM_VERSION={}", version);
    println!("cargo:rustc-env=ESM_TARGET={}", target);
}

/// `git describe`, without the leading `v` of a release tag.
fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    match described.trim() {
        "" => None,
        tag => Some(tag.trim_start_matches('v').to_string()),
    }
}
