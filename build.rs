use std::process::Command;

/// Short commit hash from git, or from `GIT_SHA` when building without a checkout
fn commit_sha() -> Option<String> {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("GIT_SHA").ok().filter(|s| !s.is_empty()))
}

fn main() {
    let base = env!("CARGO_PKG_VERSION");

    // Dev builds append the commit hash
    let dev_build = std::env::var("OEJP_DEV_BUILD")
        .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    let version = match (dev_build, commit_sha()) {
        (true, Some(sha)) => format!("{base}-dev+{sha}"),
        (true, None) => format!("{base}-dev"),
        (false, _) => base.to_string(),
    };

    println!("cargo:rustc-env=APP_VERSION={version}");
    println!("cargo:rerun-if-env-changed=OEJP_DEV_BUILD");
    println!("cargo:rerun-if-env-changed=GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
