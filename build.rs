//! Build script for rulekit
//!
//! Embeds build metadata shown by `rulekit version`.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let git_hash = run_trimmed("git", &["rev-parse", "--short=8", "HEAD"]);
    let git_branch = run_trimmed("git", &["rev-parse", "--abbrev-ref", "HEAD"]);
    let git_dirty = match run_trimmed("git", &["status", "--porcelain"]).as_str() {
        "unknown" => "unknown",
        "" => "false",
        _ => "true",
    };

    let vars = [
        ("RULEKIT_GIT_HASH", git_hash),
        ("RULEKIT_GIT_BRANCH", git_branch),
        ("RULEKIT_GIT_DIRTY", git_dirty.to_string()),
        (
            "RULEKIT_BUILD_TIMESTAMP",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
        ("RULEKIT_TARGET", env_or_unknown("TARGET")),
        ("RULEKIT_PROFILE", env_or_unknown("PROFILE")),
        ("RULEKIT_RUSTC_VERSION", run_trimmed("rustc", &["--version"])),
    ];

    for (key, value) in vars {
        println!("cargo:rustc-env={}={}", key, value);
    }
}

fn env_or_unknown(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| "unknown".to_string())
}

/// Run a command and return its trimmed stdout, or "unknown" if it failed.
fn run_trimmed(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
