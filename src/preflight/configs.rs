//! Configuration file checks (matrix and catalog).

use crate::catalog::{self, CatalogEntry, MatrixRule};
use crate::config::Settings;
use crate::version;

use super::types::CheckResult;

/// Load both config files and cross-check their contents.
pub fn check_configs(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let rules = match catalog::load_matrix(&settings.matrix_path) {
        Ok(rules) => {
            results.push(CheckResult::pass_with(
                "matrix config",
                &format!("{} driver rule(s)", rules.len()),
            ));
            Some(rules)
        }
        Err(e) => {
            results.push(CheckResult::fail("matrix config", &format!("{:#}", e)));
            None
        }
    };

    let entries = match catalog::load_catalog(&settings.catalog_path) {
        Ok(entries) => {
            results.push(CheckResult::pass_with(
                "DTK catalog",
                &format!("{} platform version(s)", entries.len()),
            ));
            Some(entries)
        }
        Err(e) => {
            results.push(CheckResult::fail("DTK catalog", &format!("{:#}", e)));
            None
        }
    };

    if let (Some(rules), Some(entries)) = (rules, entries) {
        results.extend(check_coverage(&rules, &entries));
    }

    results
}

/// A declared range with no catalog entry silently selects nothing at run
/// time; flag it here instead.
fn check_coverage(rules: &[MatrixRule], entries: &[CatalogEntry]) -> Vec<CheckResult> {
    let mut results = Vec::new();
    for rule in rules {
        for range in &rule.ocp_versions {
            let covered = entries
                .iter()
                .any(|entry| version::matches_minor(&entry.version, range));
            if !covered {
                results.push(CheckResult::warn(
                    "matrix coverage",
                    &format!(
                        "driver {} range {} matches no catalog entry",
                        rule.driver, range
                    ),
                ));
            }
        }
    }
    if results.is_empty() {
        results.push(CheckResult::pass_with(
            "matrix coverage",
            "every declared range has catalog entries",
        ));
    }
    results
}
