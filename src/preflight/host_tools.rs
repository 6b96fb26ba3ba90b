//! Host tool availability checks.

use crate::process;

use super::types::CheckResult;

/// Check host tools are installed.
pub fn check_host_tools() -> Vec<CheckResult> {
    let mut results = Vec::new();

    let required_tools = [
        ("podman", "podman", "Required to build, inspect and push images"),
        ("skopeo", "skopeo", "Required for registry tag lookups"),
        ("gh", "gh", "Required for release-notes sync"),
    ];

    for (tool, package, purpose) in required_tools {
        results.push(check_tool_exists(tool, package, purpose));
    }

    results
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path),
        None => CheckResult::fail(
            tool,
            &format!("Not found. Install '{}' package. {}", package, purpose),
        ),
    }
}
