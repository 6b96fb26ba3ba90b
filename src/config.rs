//! Configuration management for driverforge.
//!
//! Reads configuration from .env file and environment variables (main loads
//! .env via dotenvy before this runs; real environment wins). Everything has
//! a default so a bare `driverforge run` works against a local registry.

use std::env;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::registry::PublishTarget;

pub const DEFAULT_MATRIX_FILE: &str = "matrix.json";
pub const DEFAULT_CATALOG_FILE: &str = "dtk-catalog.json";
pub const DEFAULT_LOCAL_REGISTRY: &str = "localhost:5000";
pub const DEFAULT_LOCAL_REPOSITORY: &str = "neuron-driver";
pub const DEFAULT_CI_REGISTRY: &str = "ghcr.io";
pub const DEFAULT_CI_REPOSITORY: &str = "aws-neuron/driver-containers";

/// Driverforge configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Repository root; relative config paths resolve against this.
    pub base_dir: PathBuf,
    /// Path to the driver -> platform-range matrix (default: matrix.json)
    pub matrix_path: PathBuf,
    /// Path to the platform -> DTK catalog (default: dtk-catalog.json)
    pub catalog_path: PathBuf,
    /// True when running under CI; selects the CI registry.
    pub ci: bool,
    /// Build even when the kernel tag is already published.
    pub force_rebuild: bool,
    pub local_registry: String,
    pub local_repository: String,
    pub ci_registry: String,
    pub ci_repository: String,
}

fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_set(name: &str) -> bool {
    matches!(env::var(name), Ok(value) if !value.is_empty())
}

fn env_flag(name: &str) -> bool {
    matches!(env::var(name), Ok(value) if value == "1" || value.eq_ignore_ascii_case("true"))
}

impl Settings {
    /// Load configuration from the environment.
    pub fn load(base_dir: &Path) -> Self {
        let resolve = |value: String| {
            let path = PathBuf::from(value);
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        };

        Self {
            base_dir: base_dir.to_path_buf(),
            matrix_path: resolve(env_or("DRIVERFORGE_MATRIX", DEFAULT_MATRIX_FILE)),
            catalog_path: resolve(env_or("DRIVERFORGE_CATALOG", DEFAULT_CATALOG_FILE)),
            ci: env_set("CI"),
            force_rebuild: env_flag("FORCE_REBUILD"),
            local_registry: env_or("LOCAL_REGISTRY", DEFAULT_LOCAL_REGISTRY),
            local_repository: env_or("LOCAL_REPOSITORY", DEFAULT_LOCAL_REPOSITORY),
            ci_registry: env_or("CI_REGISTRY", DEFAULT_CI_REGISTRY),
            ci_repository: env_or("CI_REPOSITORY", DEFAULT_CI_REPOSITORY),
        }
    }

    /// The publish target this run pushes to. Selected once here; nothing
    /// downstream re-reads `CI`.
    pub fn target(&self) -> PublishTarget {
        if self.ci {
            PublishTarget::Ci {
                registry: self.ci_registry.clone(),
                repository: self.ci_repository.clone(),
            }
        } else {
            PublishTarget::Local {
                registry: self.local_registry.clone(),
                repository: self.local_repository.clone(),
            }
        }
    }

    /// Verify the credential the selected target needs is present. The
    /// credential itself stays ambient (podman/skopeo/gh read it); this
    /// only refuses to start a run that would fail at the first push.
    pub fn ensure_credential(&self) -> Result<(), ConfigError> {
        let target = self.target();
        if let Some(variable) = target.required_credential() {
            if !env_set(variable) {
                return Err(ConfigError::MissingCredential {
                    variable: variable.to_string(),
                    target: target.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  DRIVERFORGE_MATRIX: {}", self.matrix_path.display());
        println!("  DRIVERFORGE_CATALOG: {}", self.catalog_path.display());
        println!("  FORCE_REBUILD: {}", self.force_rebuild);
        println!("  Publish target: {}", self.target());
        if self.matrix_path.exists() {
            println!("  Matrix file: FOUND");
        } else {
            println!("  Matrix file: NOT FOUND");
        }
        if self.catalog_path.exists() {
            println!("  Catalog file: FOUND");
        } else {
            println!("  Catalog file: NOT FOUND");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "CI",
        "FORCE_REBUILD",
        "DRIVERFORGE_MATRIX",
        "DRIVERFORGE_CATALOG",
        "LOCAL_REGISTRY",
        "LOCAL_REPOSITORY",
        "CI_REGISTRY",
        "CI_REPOSITORY",
        "REGISTRY_TOKEN",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_select_local_target() {
        clear_env();
        let settings = Settings::load(Path::new("/repo"));
        assert!(!settings.ci);
        assert!(!settings.force_rebuild);
        assert_eq!(settings.matrix_path, PathBuf::from("/repo/matrix.json"));
        assert_eq!(settings.catalog_path, PathBuf::from("/repo/dtk-catalog.json"));
        match settings.target() {
            PublishTarget::Local { registry, repository } => {
                assert_eq!(registry, "localhost:5000");
                assert_eq!(repository, "neuron-driver");
            }
            other => panic!("expected local target, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_ci_selects_ci_target() {
        clear_env();
        env::set_var("CI", "true");
        let settings = Settings::load(Path::new("/repo"));
        assert!(settings.ci);
        assert!(matches!(settings.target(), PublishTarget::Ci { .. }));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_empty_ci_var_means_local() {
        clear_env();
        env::set_var("CI", "");
        let settings = Settings::load(Path::new("/repo"));
        assert!(!settings.ci);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_force_rebuild_parsing() {
        clear_env();
        for (value, expected) in
            [("1", true), ("true", true), ("TRUE", true), ("0", false), ("no", false)]
        {
            env::set_var("FORCE_REBUILD", value);
            assert_eq!(
                Settings::load(Path::new("/repo")).force_rebuild,
                expected,
                "FORCE_REBUILD={}",
                value
            );
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn test_absolute_path_override_not_rebased() {
        clear_env();
        env::set_var("DRIVERFORGE_MATRIX", "/etc/driverforge/matrix.json");
        env::set_var("DRIVERFORGE_CATALOG", "configs/catalog.json");
        let settings = Settings::load(Path::new("/repo"));
        assert_eq!(settings.matrix_path, PathBuf::from("/etc/driverforge/matrix.json"));
        assert_eq!(settings.catalog_path, PathBuf::from("/repo/configs/catalog.json"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_credential_not_required_locally() {
        clear_env();
        let settings = Settings::load(Path::new("/repo"));
        assert!(settings.ensure_credential().is_ok());
    }

    #[test]
    #[serial]
    fn test_missing_ci_credential_is_fatal() {
        clear_env();
        env::set_var("CI", "1");
        let settings = Settings::load(Path::new("/repo"));
        let err = settings.ensure_credential().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
        assert!(err.to_string().contains("REGISTRY_TOKEN"));

        env::set_var("REGISTRY_TOKEN", "ghp_example");
        let settings = Settings::load(Path::new("/repo"));
        assert!(settings.ensure_credential().is_ok());
        clear_env();
    }
}
