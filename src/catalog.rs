//! Declarative build inputs: the DTK catalog and the driver build matrix.
//!
//! Both files are JSON arrays maintained outside this tool (the catalog by a
//! release crawler, the matrix by hand) and are loaded read-only once per
//! run. Malformed content is a configuration error that stops the run before
//! any job starts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;
use crate::version;

/// One platform release the catalog knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// OCP release, `MAJOR.MINOR.PATCH`.
    pub version: String,
    /// Architecture the Driver Toolkit was published for.
    pub arch: String,
    /// Driver Toolkit image reference embedding that release's kernel headers.
    pub dtk: String,
}

/// Which OCP minor lines one driver version targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixRule {
    /// Driver version this rule covers.
    pub driver: String,
    /// `MAJOR.MINOR` lines, in declaration order.
    pub ocp_versions: Vec<String>,
}

/// Load and validate the DTK catalog.
///
/// Entries are re-sorted by numeric version components so downstream order
/// never depends on incidental file order.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let mut entries: Vec<CatalogEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))?;

    let mut seen = BTreeSet::new();
    for entry in &entries {
        if !version::is_full_version(&entry.version) {
            return Err(ConfigError::InvalidCatalog {
                reason: format!(
                    "version '{}' is not MAJOR.MINOR.PATCH",
                    entry.version
                ),
            }
            .into());
        }
        if !seen.insert(entry.version.clone()) {
            return Err(ConfigError::InvalidCatalog {
                reason: format!("duplicate platform version '{}'", entry.version),
            }
            .into());
        }
    }

    // Versions validated above, so the sort key always exists.
    entries.sort_by_key(|e| version::numeric_sort_key(&e.version).unwrap_or_default());
    Ok(entries)
}

/// Load and validate the build matrix.
pub fn load_matrix(path: &Path) -> Result<Vec<MatrixRule>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read build matrix {}", path.display()))?;
    let rules: Vec<MatrixRule> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse build matrix {}", path.display()))?;

    for rule in &rules {
        for range in &rule.ocp_versions {
            if !version::is_minor_version(range) {
                return Err(ConfigError::InvalidMatrixRange {
                    driver: rule.driver.clone(),
                    range: range.clone(),
                }
                .into());
            }
        }
    }
    Ok(rules)
}

/// Find the rule for a driver version. Asking for an undeclared driver is a
/// configuration error, distinct from "declared but matched nothing".
pub fn find_rule<'a>(rules: &'a [MatrixRule], driver: &str) -> Result<&'a MatrixRule, ConfigError> {
    rules
        .iter()
        .find(|r| r.driver == driver)
        .ok_or_else(|| ConfigError::DriverNotInMatrix {
            driver: driver.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_catalog_sorts_numerically() {
        let file = write_temp(
            r#"[
                {"version": "4.16.10", "arch": "x86_64", "dtk": "reg/dtk:c"},
                {"version": "4.16.2", "arch": "x86_64", "dtk": "reg/dtk:b"},
                {"version": "4.9.1", "arch": "x86_64", "dtk": "reg/dtk:a"}
            ]"#,
        );
        let catalog = load_catalog(file.path()).unwrap();
        let versions: Vec<&str> = catalog.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, ["4.9.1", "4.16.2", "4.16.10"]);
    }

    #[test]
    fn test_load_catalog_rejects_duplicates() {
        let file = write_temp(
            r#"[
                {"version": "4.16.2", "arch": "x86_64", "dtk": "reg/dtk:a"},
                {"version": "4.16.2", "arch": "aarch64", "dtk": "reg/dtk:b"}
            ]"#,
        );
        let err = load_catalog(file.path()).unwrap_err();
        let config = err.downcast_ref::<ConfigError>().expect("typed error");
        assert!(matches!(config, ConfigError::InvalidCatalog { .. }));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_catalog_rejects_partial_versions() {
        let file = write_temp(r#"[{"version": "4.16", "arch": "x86_64", "dtk": "reg/dtk:a"}]"#);
        let err = load_catalog(file.path()).unwrap_err();
        assert!(err.to_string().contains("MAJOR.MINOR.PATCH"));
    }

    #[test]
    fn test_load_matrix_rejects_patch_level_ranges() {
        // Ranges are minor lines; a full version here is a typo worth stopping on.
        let file = write_temp(r#"[{"driver": "2.19.64.0", "ocp_versions": ["4.16.2"]}]"#);
        let err = load_matrix(file.path()).unwrap_err();
        let config = err.downcast_ref::<ConfigError>().expect("typed error");
        assert!(matches!(config, ConfigError::InvalidMatrixRange { .. }));
    }

    #[test]
    fn test_find_rule_unknown_driver() {
        let rules = vec![MatrixRule {
            driver: "2.19.64.0".to_string(),
            ocp_versions: vec!["4.16".to_string()],
        }];
        let err = find_rule(&rules, "9.9.9").unwrap_err();
        assert!(matches!(err, ConfigError::DriverNotInMatrix { .. }));
        assert!(find_rule(&rules, "2.19.64.0").is_ok());
    }

    #[test]
    fn test_missing_file_error_names_the_path() {
        let err = load_catalog(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
