//! Build script for pairpid-an
//!
//! Stamps the binary with the commit it was built from. `GIT_HASH` appears
//! in the startup banner and in the `generator` field of every result
//! document, so a histogram file can be traced back to the code that
//! filled it. `BUILD_TIMESTAMP` and `BUILD_PROFILE` only feed the banner.
//!
//! The script reruns when HEAD moves or the checked-out branch advances,
//! not on every build; the timestamp is that of the last such rerun.

use std::path::Path;
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    if let Some(git_dir) = git(&["rev-parse", "--git-dir"]) {
        let head = Path::new(&git_dir).join("HEAD");
        println!("cargo:rerun-if-changed={}", head.display());
        if let Some(reference) = git(&["symbolic-ref", "-q", "HEAD"]) {
            let branch = Path::new(&git_dir).join(reference);
            println!("cargo:rerun-if-changed={}", branch.display());
        }
    }

    // Source tarballs have no repository
    let git_hash =
        git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
