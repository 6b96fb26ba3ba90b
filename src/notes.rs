//! Release-notes synchronization.
//!
//! After the build loop the run renders a compatibility catalog (which
//! kernels serve which OpenShift releases, and under what tag to pull them)
//! and reconciles it with the remotely published document for this driver
//! version. Uses SHA256 digests to detect actual content changes; repeated
//! runs with the same state never touch the remote document.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

use crate::grouping::KernelGroup;
use crate::process::Cmd;
use crate::registry::{PublishTarget, RegistryClient};

/// What the synchronizer did to the remote document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated,
    Unchanged,
}

/// Remote document store, keyed by driver version. Production wraps the
/// `gh` CLI; tests use an in-memory fake.
pub trait NotesStore {
    /// Current document body, or `None` if no document exists yet.
    fn fetch(&self, driver_version: &str) -> Result<Option<String>>;

    /// Create or replace the document body.
    fn publish(&self, driver_version: &str, body: &str) -> Result<()>;
}

/// Render the catalog document: one line per kernel, listing the platform
/// versions it serves and the tag to pull. Groups whose primary tag is not
/// in `published_tags` are left out, so the document only ever advertises
/// images that can actually be pulled.
pub fn render(
    driver_version: &str,
    target: &PublishTarget,
    groups: &BTreeMap<String, KernelGroup>,
    published_tags: &BTreeSet<String>,
) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "Kernel module images for Neuron driver {}.\n\n",
        driver_version
    ));
    body.push_str("Pull the image matching your cluster's kernel:\n\n");
    for (kernel, group) in groups {
        let tag = target.kernel_tag(driver_version, kernel);
        if !published_tags.contains(&tag) {
            continue;
        }
        let platforms: Vec<&str> = group.platform_versions().collect();
        body.push_str(&format!(
            "- kernel `{}` (OpenShift {}): `{}`\n",
            kernel,
            platforms.join(", "),
            target.image_ref(&tag)
        ));
    }
    body
}

/// Line-ending and trailing-whitespace normalization for comparison. The
/// remote store rewrites bodies with CRLF; a byte comparison without this
/// would update on every run.
pub fn normalize(body: &str) -> String {
    let mut normalized = body.replace("\r\n", "\n");
    normalized.truncate(normalized.trim_end().len());
    normalized
}

/// First 12 hex chars of the SHA256 of `body`, for change logging.
pub fn short_digest(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..12].to_string()
}

/// Reconcile the rendered catalog with the remote document. Writes only on
/// difference.
pub fn sync(
    store: &dyn NotesStore,
    registry: &dyn RegistryClient,
    target: &PublishTarget,
    driver_version: &str,
    groups: &BTreeMap<String, KernelGroup>,
) -> Result<SyncOutcome> {
    let published_tags: BTreeSet<String> =
        registry.list_tags(target)?.into_iter().collect();
    let rendered = render(driver_version, target, groups, &published_tags);

    let existing = store.fetch(driver_version)?;
    if let Some(current) = &existing {
        if normalize(current) == normalize(&rendered) {
            println!(
                "  [SKIP] Release notes unchanged ({})",
                short_digest(&normalize(&rendered))
            );
            return Ok(SyncOutcome::Unchanged);
        }
    }

    let old_digest = existing
        .as_deref()
        .map(|body| short_digest(&normalize(body)))
        .unwrap_or_else(|| "none".to_string());
    store.publish(driver_version, &rendered)?;
    println!(
        "  [NOTES] Release notes updated ({} -> {})",
        old_digest,
        short_digest(&normalize(&rendered))
    );
    Ok(SyncOutcome::Updated)
}

fn release_tag(driver_version: &str) -> String {
    format!("v{}", driver_version)
}

fn release_missing(stderr: &str) -> bool {
    stderr.contains("release not found")
}

/// Production store: GitHub release bodies via the `gh` CLI, one release
/// per driver version, tagged `v{driver}`.
pub struct GhReleaseStore;

impl NotesStore for GhReleaseStore {
    fn fetch(&self, driver_version: &str) -> Result<Option<String>> {
        let tag = release_tag(driver_version);
        let result = Cmd::new("gh")
            .args(["release", "view"])
            .arg(&tag)
            .args(["--json", "body", "--jq", ".body"])
            .allow_fail()
            .run()?;

        if result.success() {
            return Ok(Some(result.stdout));
        }
        if release_missing(result.stderr_trimmed()) {
            return Ok(None);
        }
        bail!(
            "gh release view {} failed (exit code {}): {}",
            tag,
            result.code(),
            result.stderr_trimmed()
        );
    }

    fn publish(&self, driver_version: &str, body: &str) -> Result<()> {
        let tag = release_tag(driver_version);
        let edit = Cmd::new("gh")
            .args(["release", "edit"])
            .arg(&tag)
            .arg("--notes")
            .arg(body)
            .allow_fail()
            .run()?;
        if edit.success() {
            return Ok(());
        }
        if !release_missing(edit.stderr_trimmed()) {
            bail!(
                "gh release edit {} failed (exit code {}): {}",
                tag,
                edit.code(),
                edit.stderr_trimmed()
            );
        }

        Cmd::new("gh")
            .args(["release", "create"])
            .arg(&tag)
            .arg("--title")
            .arg(format!("Neuron driver {}", driver_version))
            .arg("--notes")
            .arg(body)
            .error_msg(format!("Failed to create release {}", tag))
            .run()?;
        Ok(())
    }
}
