//! Kernel resolution: map a build environment to the kernel it ships.
//!
//! Each OCP release's Driver Toolkit image embeds a release descriptor
//! naming the exact kernel its headers were built for. Resolution pulls the
//! image, reads that descriptor, and validates the kernel version before it
//! is allowed downstream. A failure here drops one platform version from the
//! run; it never aborts the run.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::CatalogEntry;
use crate::errors::ResolveError;
use crate::process::Cmd;
use crate::version;

/// Path of the release descriptor inside every Driver Toolkit image.
const RELEASE_DESCRIPTOR: &str = "/etc/driver-toolkit-release.json";

/// A catalog entry whose kernel version has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedJob {
    /// OCP release this job serves.
    pub platform_version: String,
    /// Driver Toolkit image reference used to build for it.
    pub build_env_ref: String,
    /// Kernel release the toolkit targets; the deduplication key.
    pub kernel_version: String,
}

/// Extracts the kernel version embedded in a build-environment image.
pub trait DtkInspector {
    /// Raw kernel version string from the image's release descriptor.
    fn kernel_version(&self, reference: &str) -> Result<String>;
}

/// The fields of `/etc/driver-toolkit-release.json` this tool cares about.
#[derive(Debug, Deserialize)]
struct DtkRelease {
    #[serde(rename = "KERNEL_VERSION")]
    kernel_version: String,
}

/// Production inspector: runs the DTK image and reads its release descriptor
/// with podman.
pub struct PodmanDtkInspector;

impl DtkInspector for PodmanDtkInspector {
    fn kernel_version(&self, reference: &str) -> Result<String> {
        let run = Cmd::new("podman")
            .args(["run", "--rm", "--quiet", "--entrypoint", "cat"])
            .arg(reference)
            .arg(RELEASE_DESCRIPTOR)
            .error_msg(format!("Failed to read {} from {}", RELEASE_DESCRIPTOR, reference))
            .run();

        // The pulled toolkit image is only needed long enough to read the
        // descriptor; drop it before moving on so a long matrix does not
        // accumulate multi-gigabyte images locally.
        let _ = Cmd::new("podman")
            .args(["rmi", "--ignore"])
            .arg(reference)
            .allow_fail()
            .run();

        let output = run?;
        let release: DtkRelease = serde_json::from_str(output.stdout_trimmed())
            .with_context(|| format!("Invalid release descriptor in {}", reference))?;
        Ok(release.kernel_version)
    }
}

/// Resolve one catalog entry into a job, validating the kernel version shape.
pub fn resolve(
    entry: &CatalogEntry,
    inspector: &dyn DtkInspector,
) -> Result<ResolvedJob, ResolveError> {
    let kernel = inspector
        .kernel_version(&entry.dtk)
        .map_err(|cause| ResolveError::Inspect {
            reference: entry.dtk.clone(),
            cause,
        })?;

    if !version::plausible_kernel_version(&kernel) {
        return Err(ResolveError::ImplausibleKernel {
            reference: entry.dtk.clone(),
            value: kernel,
        });
    }

    Ok(ResolvedJob {
        platform_version: entry.version.clone(),
        build_env_ref: entry.dtk.clone(),
        kernel_version: kernel,
    })
}

/// Resolve every selected entry, dropping failures with a warning.
pub fn resolve_all(entries: &[CatalogEntry], inspector: &dyn DtkInspector) -> Vec<ResolvedJob> {
    let mut jobs = Vec::new();
    for entry in entries {
        match resolve(entry, inspector) {
            Ok(job) => {
                println!("  {} -> kernel {}", job.platform_version, job.kernel_version);
                jobs.push(job);
            }
            Err(e) => {
                eprintln!("  [WARN] dropping {}: {}", entry.version, e);
            }
        }
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapInspector {
        kernels: HashMap<String, String>,
    }

    impl DtkInspector for MapInspector {
        fn kernel_version(&self, reference: &str) -> Result<String> {
            self.kernels
                .get(reference)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("manifest unknown for {}", reference))
        }
    }

    fn inspector(pairs: &[(&str, &str)]) -> MapInspector {
        MapInspector {
            kernels: pairs
                .iter()
                .map(|(r, k)| (r.to_string(), k.to_string()))
                .collect(),
        }
    }

    fn entry(version: &str, dtk: &str) -> CatalogEntry {
        CatalogEntry {
            version: version.to_string(),
            arch: "x86_64".to_string(),
            dtk: dtk.to_string(),
        }
    }

    #[test]
    fn test_resolve_accepts_suffixed_kernel() {
        let inspector = inspector(&[("reg/dtk:a", "5.14.0-570.el9.x86_64")]);
        let job = resolve(&entry("4.16.1", "reg/dtk:a"), &inspector).unwrap();
        assert_eq!(job.kernel_version, "5.14.0-570.el9.x86_64");
        assert_eq!(job.platform_version, "4.16.1");
    }

    #[test]
    fn test_resolve_rejects_implausible_kernel() {
        // "null" is what a broken descriptor extraction tends to produce.
        let inspector = inspector(&[("reg/dtk:a", "null")]);
        let err = resolve(&entry("4.16.1", "reg/dtk:a"), &inspector).unwrap_err();
        assert!(matches!(err, ResolveError::ImplausibleKernel { .. }));
        assert!(err.to_string().contains("null"));
    }

    #[test]
    fn test_resolve_rejects_kernel_with_path_separator() {
        // The kernel version flows into tags and workspace paths; a
        // descriptor smuggling separators is dropped like any other
        // implausible value.
        let inspector = inspector(&[("reg/dtk:a", "5.14.0/../../x")]);
        let err = resolve(&entry("4.16.1", "reg/dtk:a"), &inspector).unwrap_err();
        assert!(matches!(err, ResolveError::ImplausibleKernel { .. }));
    }

    #[test]
    fn test_resolve_wraps_inspector_failure() {
        let inspector = inspector(&[]);
        let err = resolve(&entry("4.16.1", "reg/dtk:gone"), &inspector).unwrap_err();
        assert!(matches!(err, ResolveError::Inspect { .. }));
        assert!(err.to_string().contains("reg/dtk:gone"));
    }

    #[test]
    fn test_resolve_all_drops_failures_and_continues() {
        let inspector = inspector(&[
            ("reg/dtk:a", "5.14.0-1"),
            ("reg/dtk:bad", "null"),
            ("reg/dtk:c", "5.14.0-2"),
        ]);
        let entries = vec![
            entry("4.16.1", "reg/dtk:a"),
            entry("4.16.2", "reg/dtk:bad"),
            entry("4.17.0", "reg/dtk:c"),
        ];
        let jobs = resolve_all(&entries, &inspector);
        let platforms: Vec<&str> = jobs.iter().map(|j| j.platform_version.as_str()).collect();
        assert_eq!(platforms, ["4.16.1", "4.17.0"]);
    }

    #[test]
    fn test_descriptor_parsing() {
        let release: DtkRelease = serde_json::from_str(
            r#"{"KERNEL_VERSION": "5.14.0-427.22.1.el9_4.x86_64", "RT_KERNEL_VERSION": "5.14.0-427.22.1.rt14.337.el9_4.x86_64", "RHEL_VERSION": "9.4"}"#,
        )
        .unwrap();
        assert_eq!(release.kernel_version, "5.14.0-427.22.1.el9_4.x86_64");
    }
}
