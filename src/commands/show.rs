//! Show command - displays information.

use anyhow::Result;

use crate::catalog;
use crate::config::Settings;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Show matrix rules
    Matrix,
    /// Show the DTK catalog
    Catalog,
}

/// Execute the show command.
pub fn cmd_show(settings: &Settings, target: ShowTarget) -> Result<()> {
    match target {
        ShowTarget::Config => {
            settings.print();
        }
        ShowTarget::Matrix => {
            let rules = catalog::load_matrix(&settings.matrix_path)?;
            println!("Matrix ({}):", settings.matrix_path.display());
            for rule in &rules {
                println!("  {} -> {}", rule.driver, rule.ocp_versions.join(", "));
            }
        }
        ShowTarget::Catalog => {
            let entries = catalog::load_catalog(&settings.catalog_path)?;
            println!("DTK catalog ({}):", settings.catalog_path.display());
            for entry in &entries {
                println!("  {} ({}) -> {}", entry.version, entry.arch, entry.dtk);
            }
        }
    }
    Ok(())
}
