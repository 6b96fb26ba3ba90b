//! Publish environment checks (target, credential, workspace).

use std::env;
use std::fs;

use crate::config::Settings;

use super::types::CheckResult;

/// Check the selected publish target is usable.
pub fn check_environment(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let target = settings.target();
    results.push(CheckResult::pass_with(
        "publish target",
        &target.to_string(),
    ));

    match target.required_credential() {
        None => {
            results.push(CheckResult::skip(
                "registry credential",
                "not required for the local target",
            ));
        }
        Some(variable) => match env::var(variable) {
            Ok(value) if !value.is_empty() => {
                results.push(CheckResult::pass_with("registry credential", variable));
            }
            _ => {
                results.push(CheckResult::fail(
                    "registry credential",
                    &format!("{} is not set; pushes to {} will fail", variable, target.name()),
                ));
            }
        },
    }

    // Build workspaces are created under the repository root.
    let test_file = settings.base_dir.join(".preflight-test");
    match fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = fs::remove_file(&test_file);
            results.push(CheckResult::pass_with(
                "workspace writable",
                &settings.base_dir.display().to_string(),
            ));
        }
        Err(e) => {
            results.push(CheckResult::fail(
                "workspace writable",
                &format!("Cannot write to {}: {}", settings.base_dir.display(), e),
            ));
        }
    }

    results
}
