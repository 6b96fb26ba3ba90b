//! Preflight checks for driverforge.
//!
//! Validates host tools, configuration files and the selected publish
//! target before a run. Run with `driverforge preflight` to check
//! everything is ready.

mod configs;
mod environment;
mod host_tools;
mod types;

use anyhow::{bail, Result};

use crate::config::Settings;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(settings: &Settings) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools());

    println!("Checking configuration files...");
    checks.extend(configs::check_configs(settings));

    println!("Checking publish environment...");
    checks.extend(environment::check_environment(settings));

    println!();

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(settings: &Settings) -> Result<()> {
    let report = run_preflight(settings);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before running.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
