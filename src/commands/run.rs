//! Run command - build and publish driver images for one driver version.

use anyhow::{bail, Result};

use crate::builder::PodmanBuilder;
use crate::catalog;
use crate::config::Settings;
use crate::notes::GhReleaseStore;
use crate::orchestrator::{BuildOrchestrator, NotesStatus};
use crate::registry::CliRegistry;
use crate::resolve::PodmanDtkInspector;
use crate::version::VersionFilter;

/// Execute the run command.
pub fn cmd_run(settings: &Settings, driver: &str, filter: Option<&str>) -> Result<()> {
    let filter = VersionFilter::parse(filter)?;
    settings.ensure_credential()?;

    let rules = catalog::load_matrix(&settings.matrix_path)?;
    let rule = catalog::find_rule(&rules, driver)?;
    let entries = catalog::load_catalog(&settings.catalog_path)?;

    let target = settings.target();
    println!("=== driverforge: driver {} -> {} ===", driver, target);
    if settings.force_rebuild {
        eprintln!("  [WARN] FORCE_REBUILD is set; existing tags will be rebuilt");
    }

    let inspector = PodmanDtkInspector;
    let registry = CliRegistry;
    let builder = PodmanBuilder::new(&settings.base_dir);
    let notes = GhReleaseStore;
    let orchestrator = BuildOrchestrator::new(
        &inspector,
        &registry,
        &builder,
        &notes,
        target,
        settings.force_rebuild,
        settings.base_dir.clone(),
    );

    let result = orchestrator.run(rule, &entries, &filter)?;
    result.print_summary();

    if result.failed() > 0 {
        bail!(
            "{} of {} kernel group(s) failed",
            result.failed(),
            result.jobs.len()
        );
    }
    if let NotesStatus::Failed(reason) = &result.notes {
        bail!("Release notes sync failed: {}", reason);
    }
    Ok(())
}
