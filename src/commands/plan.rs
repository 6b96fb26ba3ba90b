//! Plan command - show what a run would build without building anything.

use anyhow::Result;

use crate::catalog;
use crate::config::Settings;
use crate::gate::{self, PublishAction};
use crate::grouping;
use crate::matrix;
use crate::registry::CliRegistry;
use crate::resolve::{self, PodmanDtkInspector};
use crate::version::VersionFilter;

/// Execute the plan command. Resolution and gate lookups are real; build,
/// push and notes sync are not performed.
pub fn cmd_plan(settings: &Settings, driver: &str, filter: Option<&str>) -> Result<()> {
    let filter = VersionFilter::parse(filter)?;

    let rules = catalog::load_matrix(&settings.matrix_path)?;
    let rule = catalog::find_rule(&rules, driver)?;
    let entries = catalog::load_catalog(&settings.catalog_path)?;

    let target = settings.target();
    println!("=== Plan: driver {} -> {} ===", driver, target);

    let selected = matrix::expand(rule, &entries, &filter)?;
    println!("=== Resolving kernels ===");
    let inspector = PodmanDtkInspector;
    let jobs = resolve::resolve_all(&selected, &inspector);
    if jobs.is_empty() {
        eprintln!("  [WARN] No kernels resolved; a run would do nothing");
        return Ok(());
    }

    let groups = grouping::group(&jobs);
    let registry = CliRegistry;
    let mut to_build = 0;
    let mut to_skip = 0;

    println!("=== Kernel groups ===");
    for (kernel, group) in &groups {
        let tag = target.kernel_tag(driver, kernel);
        let decision = gate::decide(&registry, &target, &tag, settings.force_rebuild);
        let platforms: Vec<&str> = group.platform_versions().collect();
        match decision.action {
            PublishAction::Build => {
                to_build += 1;
                println!(
                    "  [BUILD] kernel {} ({}) -> {} ({})",
                    kernel,
                    platforms.join(", "),
                    tag,
                    decision.reason
                );
            }
            PublishAction::Skip => {
                to_skip += 1;
                println!(
                    "  [SKIP] kernel {} ({}): {}",
                    kernel,
                    platforms.join(", "),
                    decision.reason
                );
            }
        }
    }

    println!();
    println!(
        "{} kernel group(s): {} to build, {} up to date",
        groups.len(),
        to_build,
        to_skip
    );
    Ok(())
}
