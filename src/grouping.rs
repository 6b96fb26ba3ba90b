//! Kernel grouping: the deduplication this whole tool exists for.
//!
//! Many OCP releases ship the same kernel, so their Driver Toolkits produce
//! byte-identical driver modules. Grouping resolved jobs by kernel version
//! collapses the platform matrix to the minimal set of builds, and keeps the
//! reverse mapping (kernel -> platform versions) the release notes need.

use std::collections::BTreeMap;

use crate::resolve::ResolvedJob;

/// One unit of build work: a kernel version and every platform release it
/// serves.
///
/// Members are kept in a `BTreeMap` so iteration order and the sample
/// selection below are deterministic without ad hoc sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelGroup {
    /// The kernel all members share; the deduplication key.
    pub kernel_version: String,
    /// Platform version -> build environment reference.
    pub members: BTreeMap<String, String>,
}

impl KernelGroup {
    /// The build environment used for this group's single build: the one
    /// belonging to the lexicographically smallest platform version. The
    /// choice is arbitrary (all members share the kernel) but must be stable
    /// across runs.
    pub fn sample_build_env(&self) -> &str {
        self.members
            .values()
            .next()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Platform versions in this group, ascending.
    pub fn platform_versions(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

/// Fold resolved jobs into per-kernel groups.
///
/// The number of keys in the returned map, not the number of input jobs,
/// is the number of builds the orchestrator performs.
pub fn group(jobs: &[ResolvedJob]) -> BTreeMap<String, KernelGroup> {
    let mut groups: BTreeMap<String, KernelGroup> = BTreeMap::new();
    for job in jobs {
        groups
            .entry(job.kernel_version.clone())
            .or_insert_with(|| KernelGroup {
                kernel_version: job.kernel_version.clone(),
                members: BTreeMap::new(),
            })
            .members
            .insert(job.platform_version.clone(), job.build_env_ref.clone());
    }
    groups
}
