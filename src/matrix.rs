//! Matrix expansion: select the catalog entries one driver build covers.

use crate::catalog::{CatalogEntry, MatrixRule};
use crate::errors::ConfigError;
use crate::version::{self, VersionFilter};

/// Expand a matrix rule against the catalog, honoring the user filter.
///
/// Iterates the catalog once so output keeps catalog (numeric) order and a
/// platform version is selected at most once even when it falls under two
/// declared ranges. An empty selection is a configuration error: the rule
/// says this driver targets those lines, so matching nothing means the
/// matrix and catalog disagree.
pub fn expand(
    rule: &MatrixRule,
    catalog: &[CatalogEntry],
    filter: &VersionFilter,
) -> Result<Vec<CatalogEntry>, ConfigError> {
    let mut selected = Vec::new();

    for entry in catalog {
        let in_declared_range = rule
            .ocp_versions
            .iter()
            .any(|line| version::matches_minor(&entry.version, line));
        if in_declared_range && filter.matches(&entry.version) {
            selected.push(entry.clone());
        }
    }

    if selected.is_empty() {
        return Err(ConfigError::NoMatchingVersions {
            driver: rule.driver.clone(),
            ranges: rule.ocp_versions.clone(),
        });
    }
    Ok(selected)
}
