//! Publish targets, tag grammar, and the registry client seam.
//!
//! There are exactly two publish targets: the developer's local registry and
//! the CI registry. The variant is selected once at startup from the
//! environment and injected everywhere a target matters; call sites never
//! re-check environment state. Authentication stays ambient (podman/skopeo
//! auth files); this module only knows which credential must be present.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::process::Cmd;

/// Where built images are pushed. There is no third variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    /// Developer workflow: a registry on the local machine, no credential.
    Local { registry: String, repository: String },
    /// Automated workflow: the CI registry, `REGISTRY_TOKEN` required.
    Ci { registry: String, repository: String },
}

impl PublishTarget {
    /// Short name used in progress output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Ci { .. } => "ci",
        }
    }

    /// `registry/repository`, without a tag.
    pub fn repository_url(&self) -> String {
        match self {
            Self::Local { registry, repository } | Self::Ci { registry, repository } => {
                format!("{}/{}", registry, repository)
            }
        }
    }

    /// Full image reference for one tag.
    pub fn image_ref(&self, tag: &str) -> String {
        format!("{}:{}", self.repository_url(), tag)
    }

    /// Primary tag: one per kernel build, the idempotency key for the
    /// publish gate.
    pub fn kernel_tag(&self, driver: &str, kernel: &str) -> String {
        format!("{}-{}", driver, kernel)
    }

    /// Human-facing alias for one platform release, pointing at the same
    /// artifact as the kernel tag. The local registry is dedicated to this
    /// driver, so the bare form is unambiguous there; the CI registry is a
    /// shared namespace and carries the product prefix.
    pub fn alias_tag(&self, driver: &str, platform: &str) -> String {
        match self {
            Self::Local { .. } => format!("{}-ocp{}", driver, platform),
            Self::Ci { .. } => format!("neuron-driver{}-ocp{}", driver, platform),
        }
    }

    /// Environment variable that must be set before a run against this
    /// target may start, if any.
    pub fn required_credential(&self) -> Option<&'static str> {
        match self {
            Self::Local { .. } => None,
            Self::Ci { .. } => Some("REGISTRY_TOKEN"),
        }
    }
}

impl std::fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.repository_url())
    }
}

/// Registry operations the run needs. Production shells out to skopeo and
/// podman; tests substitute an in-memory fake.
pub trait RegistryClient {
    /// Whether `tag` already exists on the target.
    ///
    /// `Ok(false)` means definitively absent. A transport or registry error
    /// is returned as `Err` so callers can distinguish "absent" from
    /// "could not tell"; the publish gate treats the latter as build.
    fn tag_exists(&self, target: &PublishTarget, tag: &str) -> Result<bool>;

    /// All tags currently published on the target repository. A repository
    /// that does not exist yet lists as empty.
    fn list_tags(&self, target: &PublishTarget) -> Result<Vec<String>>;

    /// Push the locally tagged `image` to the target as `tag`.
    fn push(&self, target: &PublishTarget, image: &str, tag: &str) -> Result<()>;
}

/// skopeo's `list-tags` output shape.
#[derive(Debug, Deserialize)]
struct TagListing {
    #[serde(rename = "Tags")]
    tags: Vec<String>,
}

/// stderr fragments that mean "the tag/repository is not there", as opposed
/// to a transport failure. Anything else stays an error so the publish gate
/// can fall back to building instead of wrongly skipping.
const ABSENT_MARKERS: &[&str] = &[
    "manifest unknown",
    "name unknown",
    "repository not found",
];

fn looks_absent(stderr: &str) -> bool {
    ABSENT_MARKERS.iter().any(|m| stderr.contains(m))
}

/// Production client backed by skopeo lookups and podman pushes.
pub struct CliRegistry;

impl RegistryClient for CliRegistry {
    fn tag_exists(&self, target: &PublishTarget, tag: &str) -> Result<bool> {
        let reference = format!("docker://{}", target.image_ref(tag));
        let result = Cmd::new("skopeo")
            .args(["inspect", "--raw"])
            .arg(&reference)
            .allow_fail()
            .run()?;

        if result.success() {
            return Ok(true);
        }
        if looks_absent(result.stderr_trimmed()) {
            return Ok(false);
        }
        bail!(
            "skopeo inspect of {} failed (exit code {}): {}",
            reference,
            result.code(),
            result.stderr_trimmed()
        );
    }

    fn list_tags(&self, target: &PublishTarget) -> Result<Vec<String>> {
        let reference = format!("docker://{}", target.repository_url());
        let result = Cmd::new("skopeo")
            .arg("list-tags")
            .arg(&reference)
            .allow_fail()
            .run()?;

        if !result.success() {
            if looks_absent(result.stderr_trimmed()) {
                return Ok(Vec::new());
            }
            bail!(
                "skopeo list-tags of {} failed (exit code {}): {}",
                reference,
                result.code(),
                result.stderr_trimmed()
            );
        }

        let listing: TagListing = serde_json::from_str(result.stdout_trimmed())
            .with_context(|| format!("Invalid tag listing from {}", reference))?;
        Ok(listing.tags)
    }

    fn push(&self, target: &PublishTarget, image: &str, tag: &str) -> Result<()> {
        let destination = format!("docker://{}", target.image_ref(tag));
        // Local dev registries speak plain HTTP; podman needs to be told.
        let mut cmd = Cmd::new("podman").arg("push");
        if matches!(target, PublishTarget::Local { .. }) {
            cmd = cmd.arg("--tls-verify=false");
        }
        cmd.arg(image)
            .arg(&destination)
            .error_msg(format!("Failed to push {} to {}", image, destination))
            .run()?;
        println!("  [PUSH] {}", target.image_ref(tag));
        Ok(())
    }
}
